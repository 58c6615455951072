//! Streaming volume profile engine

use super::types::{ProfileError, VolumeNode, VolumeProfile};
use crate::feed::{Candle, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, VecDeque};

/// Volume profile parameters
#[derive(Debug, Clone)]
pub struct ProfileParams {
    /// Fixed bucket width in quote-price units
    pub bucket_width: Decimal,
    /// Sliding window length in closed candles
    pub window_candles: usize,
    /// High-volume node threshold, relative to POC volume
    pub hvn_ratio: Decimal,
    /// Low-volume node threshold, relative to POC volume
    pub lvn_ratio: Decimal,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            bucket_width: dec!(10),
            window_candles: 60,
            hvn_ratio: dec!(0.70),
            lvn_ratio: dec!(0.20),
        }
    }
}

/// Rolling volume-by-price histogram for one (symbol, timeframe)
///
/// Each closed candle's volume is attributed to the bucket containing its
/// close price. When the window is full the oldest candle's contribution is
/// subtracted on the next close, so updates stay O(1) amortized.
pub struct VolumeProfileEngine {
    symbol: String,
    timeframe: Timeframe,
    params: ProfileParams,
    /// bucket index -> accumulated volume
    buckets: BTreeMap<i64, Decimal>,
    /// (open_time, bucket, volume) per in-window candle, oldest first
    window: VecDeque<(DateTime<Utc>, i64, Decimal)>,
    last_open_time: Option<DateTime<Utc>>,
}

impl VolumeProfileEngine {
    /// Create an engine for one (symbol, timeframe) pair
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, params: ProfileParams) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            params,
            buckets: BTreeMap::new(),
            window: VecDeque::new(),
            last_open_time: None,
        }
    }

    /// Ingest a closed candle
    ///
    /// Rejects candles whose open time is not strictly after the last
    /// accepted one (out-of-order or duplicate); rejected candles leave the
    /// histogram untouched.
    pub fn ingest(&mut self, candle: &Candle) -> Result<(), ProfileError> {
        if let Some(last) = self.last_open_time {
            if candle.open_time <= last {
                return Err(ProfileError::OrderingViolation {
                    symbol: self.symbol.clone(),
                    timeframe: self.timeframe,
                    open_time: candle.open_time,
                    last_open_time: last,
                });
            }
        }

        let bucket = self.bucket_index(candle.close);
        *self.buckets.entry(bucket).or_insert(Decimal::ZERO) += candle.volume;
        self.window.push_back((candle.open_time, bucket, candle.volume));
        self.last_open_time = Some(candle.open_time);

        if self.window.len() > self.params.window_candles {
            let (_, old_bucket, old_volume) = self.window.pop_front().expect("window non-empty");
            let remaining = {
                let entry = self
                    .buckets
                    .get_mut(&old_bucket)
                    .expect("evicted bucket exists");
                *entry -= old_volume;
                *entry
            };
            if remaining.is_zero() {
                self.buckets.remove(&old_bucket);
            }
        }

        Ok(())
    }

    /// Current profile snapshot
    ///
    /// Returns `InsufficientData` until the window holds `window_candles`
    /// closed candles.
    pub fn snapshot(&self) -> Result<VolumeProfile, ProfileError> {
        if self.window.len() < self.params.window_candles || self.buckets.is_empty() {
            return Err(ProfileError::InsufficientData {
                have: self.window.len(),
                need: self.params.window_candles.max(1),
            });
        }

        // BTreeMap iterates ascending by bucket, so a strict `>` makes the
        // lowest-price bucket win POC ties deterministically.
        let (poc_bucket, poc_volume) = self
            .buckets
            .iter()
            .fold((i64::MIN, Decimal::MIN), |(bi, bv), (&i, &v)| {
                if v > bv {
                    (i, v)
                } else {
                    (bi, bv)
                }
            });

        let hvn_floor = poc_volume * self.params.hvn_ratio;
        let lvn_ceil = poc_volume * self.params.lvn_ratio;

        let buckets: Vec<VolumeNode> = self
            .buckets
            .iter()
            .map(|(&i, &v)| VolumeNode {
                price: self.bucket_price(i),
                volume: v,
            })
            .collect();

        let high_volume_nodes = buckets
            .iter()
            .filter(|n| n.volume >= hvn_floor)
            .cloned()
            .collect();
        let low_volume_nodes = buckets
            .iter()
            .filter(|n| n.volume <= lvn_ceil)
            .cloned()
            .collect();

        Ok(VolumeProfile {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            window_candles: self.window.len(),
            buckets,
            point_of_control: VolumeNode {
                price: self.bucket_price(poc_bucket),
                volume: poc_volume,
            },
            high_volume_nodes,
            low_volume_nodes,
        })
    }

    /// Total volume currently held in the histogram
    pub fn total_volume(&self) -> Decimal {
        self.buckets.values().copied().sum()
    }

    /// Number of candles currently in the window
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Configured window size in candles
    pub fn window_target(&self) -> usize {
        self.params.window_candles
    }

    fn bucket_index(&self, price: Decimal) -> i64 {
        (price / self.params.bucket_width)
            .floor()
            .to_i64()
            .unwrap_or(0)
    }

    fn bucket_price(&self, index: i64) -> Decimal {
        Decimal::from(index) * self.params.bucket_width + self.params.bucket_width / dec!(2)
    }
}
