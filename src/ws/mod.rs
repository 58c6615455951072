//! Reconnecting WebSocket client
//!
//! Read-only market data streaming with automatic reconnection and
//! ping/pong keepalive.

mod client;
mod types;

pub use client::WsClient;
pub use types::{WsConfig, WsError, WsEvent};
