//! Volume profile types

use crate::feed::Timeframe;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Volume profile errors
#[derive(Debug, Clone, Error)]
pub enum ProfileError {
    /// Candle arrived out of order or duplicated an accepted open time
    #[error("ordering violation for {symbol} {timeframe}: candle {open_time} not after {last_open_time}")]
    OrderingViolation {
        symbol: String,
        timeframe: Timeframe,
        open_time: DateTime<Utc>,
        last_open_time: DateTime<Utc>,
    },
    /// Sliding window not yet filled
    #[error("insufficient data: {have}/{need} candles in window")]
    InsufficientData { have: usize, need: usize },
}

/// One price bucket of a volume profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeNode {
    /// Bucket midpoint price
    pub price: Decimal,
    /// Accumulated volume in the bucket
    pub volume: Decimal,
}

/// Snapshot of the rolling volume distribution for one (symbol, timeframe)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProfile {
    /// Trading symbol
    pub symbol: String,
    /// Timeframe of the contributing candles
    pub timeframe: Timeframe,
    /// Number of candles in the window
    pub window_candles: usize,
    /// All non-empty buckets, ascending by price
    pub buckets: Vec<VolumeNode>,
    /// Bucket with the maximum accumulated volume
    pub point_of_control: VolumeNode,
    /// Buckets at or above the high-volume threshold (includes the POC)
    pub high_volume_nodes: Vec<VolumeNode>,
    /// Buckets at or below the low-volume threshold
    pub low_volume_nodes: Vec<VolumeNode>,
}

impl VolumeProfile {
    /// Total volume across all buckets
    pub fn total_volume(&self) -> Decimal {
        self.buckets.iter().map(|n| n.volume).sum()
    }

    /// The high-volume node closest to `price`
    pub fn nearest_high_volume_node(&self, price: Decimal) -> Option<&VolumeNode> {
        self.high_volume_nodes
            .iter()
            .min_by_key(|n| (n.price - price).abs())
    }

    /// Whether `price` lies within `proximity_pct` of some high-volume node
    pub fn is_near_high_volume_node(&self, price: Decimal, proximity_pct: Decimal) -> bool {
        self.nearest_high_volume_node(price)
            .map(|n| {
                if n.price.is_zero() {
                    return false;
                }
                ((price - n.price) / n.price).abs() <= proximity_pct
            })
            .unwrap_or(false)
    }
}
