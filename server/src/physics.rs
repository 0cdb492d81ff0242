//! One simulation step for a pong session.
//!
//! Everything here is a plain function of its arguments. The only
//! nondeterminism comes from the `rng` the caller passes in, so a seeded
//! generator makes whole rallies reproducible.
//!
//! Collision is discrete: the ball is tested where it ends up after the
//! integration step. A fast enough ball can pass through a 20px paddle
//! between two ticks; that matches the reference behavior and is kept.

use pong_shared::config::{
    paddle_x, BALL_RADIUS, BALL_START_SPEED_X, BALL_START_SPEED_Y, FIELD_HEIGHT, FIELD_WIDTH,
    PADDLE_CENTER_Y, PADDLE_HEIGHT, PADDLE_WIDTH,
};
use pong_shared::protocol::{BallWire, ScoresWire};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub speed_x: f64,
    pub speed_y: f64,
}

impl Default for Ball {
    fn default() -> Self {
        Self {
            x: FIELD_WIDTH / 2.0,
            y: FIELD_HEIGHT / 2.0,
            radius: BALL_RADIUS,
            speed_x: BALL_START_SPEED_X,
            speed_y: BALL_START_SPEED_Y,
        }
    }
}

impl Ball {
    pub fn to_wire(&self) -> BallWire {
        BallWire {
            x: self.x,
            y: self.y,
            radius: self.radius,
            speed_x: self.speed_x,
            speed_y: self.speed_y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scores {
    pub player1: u32,
    pub player2: u32,
}

impl Scores {
    pub fn total(&self) -> u32 {
        self.player1 + self.player2
    }

    pub fn to_wire(&self) -> ScoresWire {
        ScoresWire {
            player1: self.player1,
            player2: self.player2,
        }
    }
}

/// A paddle as the engine sees it: which side it guards and its top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paddle {
    pub slot: u8,
    pub y: f64,
}

impl Paddle {
    fn hit_by(&self, ball: &Ball) -> bool {
        let px = paddle_x(self.slot);
        ball.x + ball.radius > px
            && ball.x - ball.radius < px + PADDLE_WIDTH
            && ball.y > self.y
            && ball.y < self.y + PADDLE_HEIGHT
    }
}

/// Which player scored during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Player1,
    Player2,
}

/// Advance the ball by one tick.
///
/// `paddles` holds only the occupied slots. Returns the goal scored in this
/// step, if any; in that case the ball and paddles have already been reset.
pub fn advance(
    ball: &mut Ball,
    scores: &mut Scores,
    paddles: &mut [&mut Paddle],
    rng: &mut impl Rng,
) -> Option<Goal> {
    ball.x += ball.speed_x;
    ball.y += ball.speed_y;

    if ball.y - ball.radius < 0.0 || ball.y + ball.radius > FIELD_HEIGHT {
        ball.speed_y = -ball.speed_y;
    }

    for paddle in paddles.iter() {
        if paddle.hit_by(ball) {
            ball.speed_x = -ball.speed_x;
            ball.speed_y += rng.gen_range(-1.0..1.0);
        }
    }

    let goal = if ball.x - ball.radius < 0.0 {
        scores.player2 += 1;
        Some(Goal::Player2)
    } else if ball.x + ball.radius > FIELD_WIDTH {
        scores.player1 += 1;
        Some(Goal::Player1)
    } else {
        None
    };

    if goal.is_some() {
        reset(ball, paddles, rng);
    }
    goal
}

/// Serve again from the center towards the player who just conceded.
pub fn reset(ball: &mut Ball, paddles: &mut [&mut Paddle], rng: &mut impl Rng) {
    ball.x = FIELD_WIDTH / 2.0;
    ball.y = FIELD_HEIGHT / 2.0;
    ball.speed_x = -ball.speed_x;
    ball.speed_y = if rng.gen_bool(0.5) {
        BALL_START_SPEED_Y
    } else {
        -BALL_START_SPEED_Y
    };
    for paddle in paddles.iter_mut() {
        paddle.y = PADDLE_CENTER_Y;
    }
}
