//! Courier - WebSocket event broadcasting hub
//!
//! Services publish JSON events to named channels over HTTP; subscribed
//! WebSocket clients receive them in near-real-time.

pub mod api;
pub mod auth;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod hub;
pub mod limiter;
pub mod message;
pub mod shutdown;

pub use config::Config;
pub use error::Error;
