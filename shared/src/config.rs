//! Playing field geometry.
//!
//! Clients render with these same numbers, so changing any of them breaks
//! compatibility with existing peers.

/// Field width in pixels
pub const FIELD_WIDTH: f64 = 1000.0;
/// Field height in pixels
pub const FIELD_HEIGHT: f64 = 600.0;

pub const PADDLE_WIDTH: f64 = 20.0;
pub const PADDLE_HEIGHT: f64 = 60.0;
/// Distance from the field edge to the paddle's left side (slot 1) or to
/// its anchor (slot 2, at `FIELD_WIDTH - PADDLE_INSET`)
pub const PADDLE_INSET: f64 = 60.0;
/// Paddle movement per client frame. The server never moves paddles itself.
pub const PADDLE_SPEED: f64 = 6.0;
/// Paddle top for a freshly assigned slot
pub const PADDLE_START_Y: f64 = 300.0;
/// Paddle top after a goal: vertically centered
pub const PADDLE_CENTER_Y: f64 = (FIELD_HEIGHT - PADDLE_HEIGHT) / 2.0;

pub const BALL_RADIUS: f64 = 10.0;
pub const BALL_START_SPEED_X: f64 = 5.0;
pub const BALL_START_SPEED_Y: f64 = 3.0;

/// Simulation ticks per second
pub const TICK_RATE_HZ: u32 = 60;

/// Left edge of the paddle owned by `slot` (1 or 2).
pub const fn paddle_x(slot: u8) -> f64 {
    if slot == 1 {
        PADDLE_INSET
    } else {
        FIELD_WIDTH - PADDLE_INSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paddles_sit_at_fixed_anchors() {
        assert_eq!(paddle_x(1), 60.0);
        assert_eq!(paddle_x(2), 940.0);
    }

    #[test]
    fn center_position_keeps_paddle_inside_field() {
        assert_eq!(PADDLE_CENTER_Y, 270.0);
        assert!(PADDLE_CENTER_Y + PADDLE_HEIGHT <= FIELD_HEIGHT);
    }
}
