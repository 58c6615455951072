//! Market feed module
//!
//! Normalizes exchange market data into canonical tick and candle streams.

mod binance;
mod candle;
mod rest;
mod types;

pub use binance::BinanceFuturesFeed;
pub use candle::{AggregateError, CandleAggregator};
pub use rest::FuturesRestClient;
pub use types::{Candle, Tick, Timeframe};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Streaming market data source
///
/// Implementations deliver ticks in per-symbol timestamp order.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Subscribe to the tick stream for the configured symbols
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Tick>>;
}
