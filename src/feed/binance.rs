//! Binance USDⓈ-M futures feed
//!
//! Streams aggregated trades for the configured symbols over one combined
//! WebSocket stream and normalizes them into ticks.

use super::{MarketFeed, Tick};
use crate::ws::{WsClient, WsConfig, WsEvent};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;

/// Binance futures combined-stream base URL
const BINANCE_FUTURES_WS_URL: &str = "wss://fstream.binance.com";

/// Combined stream frame wrapper
#[derive(Debug, Deserialize)]
struct CombinedFrame {
    data: AggTradeMessage,
}

/// Aggregated trade payload
#[derive(Debug, Deserialize)]
struct AggTradeMessage {
    /// Event type
    #[serde(rename = "e")]
    event_type: String,
    /// Symbol
    #[serde(rename = "s")]
    symbol: String,
    /// Price
    #[serde(rename = "p")]
    price: String,
    /// Quantity
    #[serde(rename = "q")]
    quantity: String,
    /// Trade time (milliseconds)
    #[serde(rename = "T")]
    trade_time: i64,
}

/// Binance futures aggTrade feed for a set of symbols
pub struct BinanceFuturesFeed {
    symbols: Vec<String>,
    base_url: String,
}

impl BinanceFuturesFeed {
    /// Create a feed for the given symbols
    pub fn new(symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            symbols: symbols.into_iter().map(|s| s.into().to_lowercase()).collect(),
            base_url: BINANCE_FUTURES_WS_URL.to_string(),
        }
    }

    /// Override the stream base URL (tests, alternative clusters)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the combined-stream URL for all symbols
    fn build_stream_url(&self) -> String {
        let streams: Vec<String> = self
            .symbols
            .iter()
            .map(|s| format!("{}@aggTrade", s))
            .collect();
        format!("{}/stream?streams={}", self.base_url, streams.join("/"))
    }

    /// Parse one combined frame into a tick
    fn parse_frame(msg: &str) -> Option<Tick> {
        let frame: CombinedFrame = serde_json::from_str(msg).ok()?;
        let trade = frame.data;

        if trade.event_type != "aggTrade" {
            return None;
        }

        let price = Decimal::from_str(&trade.price).ok()?;
        let volume = Decimal::from_str(&trade.quantity).ok()?;
        let timestamp = Utc.timestamp_millis_opt(trade.trade_time).single()?;

        Some(Tick {
            symbol: trade.symbol,
            timestamp,
            price,
            volume,
        })
    }

    /// Forward parsed ticks until the stream or the receiver goes away
    async fn run_message_loop(mut ws_rx: mpsc::Receiver<WsEvent>, tick_tx: mpsc::Sender<Tick>) {
        while let Some(event) = ws_rx.recv().await {
            match event {
                WsEvent::Text(text) => {
                    if let Some(tick) = Self::parse_frame(&text) {
                        if tick_tx.send(tick).await.is_err() {
                            tracing::debug!("Tick receiver dropped, stopping feed");
                            break;
                        }
                    }
                }
                WsEvent::Connected => {
                    tracing::info!("Binance futures feed connected");
                }
                WsEvent::Disconnected => {
                    tracing::warn!("Binance futures feed disconnected");
                    break;
                }
                WsEvent::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Binance futures feed reconnecting");
                }
            }
        }
    }
}

#[async_trait]
impl MarketFeed for BinanceFuturesFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Tick>> {
        let (tick_tx, tick_rx) = mpsc::channel(1024);
        let url = self.build_stream_url();

        tracing::info!(symbols = ?self.symbols, "Subscribing to Binance futures feed");

        let config = WsConfig::new(url)
            .max_reconnects(0)
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .ping_interval(Duration::from_secs(30));
        let ws_rx = WsClient::new(config).connect();

        tokio::spawn(async move {
            Self::run_message_loop(ws_rx, tick_tx).await;
        });

        Ok(tick_rx)
    }
}
