//! Types shared between the pong server and Rust protocol peers.

pub mod config;
pub mod protocol;
