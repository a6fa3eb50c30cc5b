//! HTTP and WebSocket API

pub mod heartbeat;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{run_server, AppState, SharedState};
