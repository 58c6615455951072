//! WebSocket types and configuration

use std::time::Duration;
use thiserror::Error;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// URL to connect to
    pub url: String,
    /// Reconnection attempts before giving up (0 = unlimited)
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnection attempt
    pub initial_reconnect_delay: Duration,
    /// Reconnection delay ceiling
    pub max_reconnect_delay: Duration,
    /// Interval between outgoing ping frames
    pub ping_interval: Duration,
}

impl WsConfig {
    /// Create a config for the given URL with default timing
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_reconnect_attempts: 0,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(60),
            ping_interval: Duration::from_secs(30),
        }
    }

    /// Set the reconnection attempt limit
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_reconnect_attempts = n;
        self
    }

    /// Set the initial reconnection delay
    pub fn initial_delay(mut self, d: Duration) -> Self {
        self.initial_reconnect_delay = d;
        self
    }

    /// Set the reconnection delay ceiling
    pub fn max_delay(mut self, d: Duration) -> Self {
        self.max_reconnect_delay = d;
        self
    }

    /// Set the ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }
}

/// Events delivered to stream consumers
#[derive(Debug, Clone)]
pub enum WsEvent {
    /// Text frame payload
    Text(String),
    /// Connection established
    Connected,
    /// Connection closed for good
    Disconnected,
    /// Reconnecting after a failure
    Reconnecting { attempt: u32 },
}

/// WebSocket client errors
#[derive(Debug, Clone, Error)]
pub enum WsError {
    /// Connect or stream failure
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// Reconnection attempt limit reached
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
    /// Outgoing frame could not be written
    #[error("send failed: {0}")]
    SendFailed(String),
}
