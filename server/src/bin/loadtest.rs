//! Load test for the pong server.
//!
//! Spawns many fake WebSocket clients that:
//! - Connect and wait for their seat (`assignPlayer`)
//! - Sweep their paddle up and down with `updatePosition` at the tick rate
//! - Count the snapshots they receive
//!
//! Clients pair up in arrival order, so an even `--clients` fills every game.
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 100)
//!   --duration S     Test duration in seconds (default: 30)
//!   --url URL        Server URL (default: ws://127.0.0.1:3000/ws)

use futures_util::{SinkExt, StreamExt};
use pong_server::protocol::{ClientMsg, ServerMsg};
use pong_shared::config::{FIELD_HEIGHT, PADDLE_HEIGHT, PADDLE_SPEED, TICK_RATE_HZ};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

struct Metrics {
    connected: AtomicU64,
    seated: AtomicU64,
    messages_received: AtomicU64,
    snapshots_received: AtomicU64,
    positions_sent: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    fn new() -> Self {
        Self {
            connected: AtomicU64::new(0),
            seated: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            snapshots_received: AtomicU64::new(0),
            positions_sent: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }
}

// === Client task ===

async fn run_client(client_id: u32, url: String, duration: Duration, metrics: Arc<Metrics>) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    metrics
        .latency_sum_ms
        .fetch_add(connect_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    // Wait for the seat assignment before doing anything else
    let seat = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    if let Ok(ServerMsg::AssignPlayer(assign)) =
                        serde_json::from_str::<ServerMsg>(&text)
                    {
                        return Some(assign.player_id);
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                _ => {}
            }
        }
        None
    })
    .await;

    let player_id = match seat {
        Ok(Some(id)) => id,
        Ok(None) | Err(_) => {
            if client_id < 3 {
                eprintln!("Client {} was not seated", client_id);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            metrics.connected.fetch_sub(1, Ordering::Relaxed);
            return;
        }
    };
    metrics.seated.fetch_add(1, Ordering::Relaxed);

    let mut move_timer =
        tokio::time::interval(Duration::from_secs_f64(1.0 / TICK_RATE_HZ as f64));
    move_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;
    let mut y = (FIELD_HEIGHT - PADDLE_HEIGHT) / 2.0;
    let mut direction = if client_id % 2 == 0 { 1.0 } else { -1.0 };

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = move_timer.tick() => {
                y += direction * PADDLE_SPEED;
                if y <= 0.0 || y >= FIELD_HEIGHT - PADDLE_HEIGHT {
                    direction = -direction;
                    y = y.clamp(0.0, FIELD_HEIGHT - PADDLE_HEIGHT);
                }

                let msg = ClientMsg::UpdatePosition { player_id, y };
                let Ok(json) = serde_json::to_string(&msg) else {
                    continue;
                };
                if ws.send(Message::Text(json.into())).await.is_ok() {
                    metrics.positions_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        if text.contains("\"type\":\"updateGameState\"") {
                            metrics.snapshots_received.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 100;
    let mut duration_secs: u64 = 30;
    let mut url = "ws://127.0.0.1:3000/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(100);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Pong Server Load Test ===");
    println!("Clients: {} ({} games)", num_clients, num_clients.div_ceil(2));
    println!("Duration: {}s", duration_secs);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::new());
    let duration = Duration::from_secs(duration_secs);
    let mut handles = Vec::with_capacity(num_clients as usize);

    let spawn_start = Instant::now();
    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);
        handles.push(tokio::spawn(async move {
            run_client(client_id, url, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();
        loop {
            interval.tick().await;
            println!(
                "[{:3}s] connected={}, seated={}, msgs={}, snapshots={}, positions={}, errors={}",
                start.elapsed().as_secs(),
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.seated.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.snapshots_received.load(Ordering::Relaxed),
                metrics_clone.positions_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    println!();
    println!("=== Final Results ===");
    let snapshots = metrics.snapshots_received.load(Ordering::Relaxed);
    let seated = metrics.seated.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);

    println!("Seated clients: {}", seated);
    println!(
        "Total messages received: {}",
        metrics.messages_received.load(Ordering::Relaxed)
    );
    println!("Total snapshots: {}", snapshots);
    println!(
        "Total position updates sent: {}",
        metrics.positions_sent.load(Ordering::Relaxed)
    );
    println!("Errors: {}", metrics.errors.load(Ordering::Relaxed));
    if latency_count > 0 {
        println!("Avg connect latency: {}ms", latency_sum / latency_count);
    }
    if seated > 0 && duration_secs > 0 {
        println!(
            "Snapshots per client per second: {:.1}",
            snapshots as f64 / seated as f64 / duration_secs as f64
        );
    }
}
