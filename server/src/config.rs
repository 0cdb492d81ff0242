use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    /// Base seed; each session derives its own generator from it
    pub rng_seed: u64,
    /// Capacity of the game loop's command channel
    pub command_buffer: usize,
    /// Per-connection outbound queue. Messages beyond it are dropped.
    pub outbound_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            tick_rate_hz: pong_shared::config::TICK_RATE_HZ,
            rng_seed: 42,
            command_buffer: 1024,
            outbound_buffer: 64,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `HOST`, `PORT`, `PONG_TICK_RATE_HZ` and
    /// `PONG_RNG_SEED` when set.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match lookup("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| format!("invalid PORT {:?}: {}", port, e))?,
            None => 3000,
        };
        config.listen_addr = format!("{}:{}", host, port);

        if let Some(rate) = lookup("PONG_TICK_RATE_HZ") {
            config.tick_rate_hz = rate
                .parse()
                .map_err(|e| format!("invalid PONG_TICK_RATE_HZ {:?}: {}", rate, e))?;
        }
        if let Some(seed) = lookup("PONG_RNG_SEED") {
            config.rng_seed = seed
                .parse()
                .map_err(|e| format!("invalid PONG_RNG_SEED {:?}: {}", seed, e))?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr must not be empty".to_string());
        }
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1000 {
            return Err("tick_rate_hz must be in 1..=1000".to_string());
        }
        if self.command_buffer == 0 {
            return Err("command_buffer must be > 0".to_string());
        }
        if self.outbound_buffer == 0 {
            return Err("outbound_buffer must be > 0".to_string());
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }
}
