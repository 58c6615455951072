//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Reconnecting read-only WebSocket client
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// The configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and stream events to the returned receiver
    ///
    /// Spawns a background task that owns the connection, reconnects with
    /// exponential backoff on failure, and answers server pings. The task
    /// stops when the receiver is dropped or the reconnect limit is hit.
    pub fn connect(&self) -> mpsc::Receiver<WsEvent> {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run(config, tx).await {
                tracing::error!(error = %e, "WebSocket stream ended");
            }
        });

        rx
    }

    async fn run(config: WsConfig, tx: mpsc::Sender<WsEvent>) -> Result<(), WsError> {
        let mut attempts = 0;
        let mut delay = config.initial_reconnect_delay;

        loop {
            match Self::stream_once(&config, &tx).await {
                Ok(()) => {
                    tracing::info!("WebSocket closed cleanly");
                    let _ = tx.send(WsEvent::Disconnected).await;
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(error = %e, attempt = attempts, "WebSocket error, reconnecting");

                    if config.max_reconnect_attempts > 0 && attempts >= config.max_reconnect_attempts
                    {
                        let _ = tx.send(WsEvent::Disconnected).await;
                        return Err(WsError::MaxReconnectsExceeded);
                    }
                    if tx.is_closed() {
                        return Ok(());
                    }

                    let _ = tx.send(WsEvent::Reconnecting { attempt: attempts }).await;
                    sleep(delay).await;
                    delay = (delay * 2).min(config.max_reconnect_delay);
                }
            }
        }
    }

    /// One connection lifetime: stream frames until close or error
    async fn stream_once(config: &WsConfig, tx: &mpsc::Sender<WsEvent>) -> Result<(), WsError> {
        tracing::info!(url = %config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(&config.url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        if tx.send(WsEvent::Connected).await.is_err() {
            return Ok(());
        }

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsEvent::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Received close frame");
                            return Ok(());
                        }
                        Some(Ok(_)) => {
                            // Pong and binary frames carry nothing for us
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("stream ended unexpectedly".into()));
                        }
                    }
                }
                _ = ping_interval.tick() => {
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                }
            }
        }
    }
}
