//! Pong server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod game_loop;
pub mod physics;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod ws;
