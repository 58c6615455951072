//! Tick-to-candle aggregation
//!
//! Rolls a tick stream into candles for one (symbol, timeframe) pair.
//! Exactly one candle is open at a time; a tick that lands in a later
//! window closes the current candle and opens the next.

use super::types::{Candle, Tick, Timeframe};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Tick rejected by the aggregator
#[derive(Debug, Clone, Error)]
pub enum AggregateError {
    /// Tick timestamp precedes the last accepted tick
    #[error("out-of-order tick for {symbol} {timeframe}: {timestamp} < {last_accepted}")]
    OutOfOrder {
        symbol: String,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
        last_accepted: DateTime<Utc>,
    },
    /// Tick belongs to a different symbol
    #[error("symbol mismatch: expected {expected}, got {got}")]
    SymbolMismatch { expected: String, got: String },
}

/// Per-(symbol, timeframe) candle builder
#[derive(Debug)]
pub struct CandleAggregator {
    symbol: String,
    timeframe: Timeframe,
    open_candle: Option<Candle>,
    last_tick_ts: Option<DateTime<Utc>>,
}

impl CandleAggregator {
    /// Create an aggregator for one (symbol, timeframe) pair
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            open_candle: None,
            last_tick_ts: None,
        }
    }

    /// Fold a tick into the stream
    ///
    /// Returns `Ok(Some(candle))` with the freshly closed candle when the
    /// tick opens a new window, `Ok(None)` when it extends the current one.
    /// Ticks strictly older than the last accepted tick are rejected;
    /// equal timestamps are legitimate (multiple trades in one millisecond).
    pub fn on_tick(&mut self, tick: &Tick) -> Result<Option<Candle>, AggregateError> {
        if tick.symbol != self.symbol {
            return Err(AggregateError::SymbolMismatch {
                expected: self.symbol.clone(),
                got: tick.symbol.clone(),
            });
        }

        if let Some(last) = self.last_tick_ts {
            if tick.timestamp < last {
                return Err(AggregateError::OutOfOrder {
                    symbol: self.symbol.clone(),
                    timeframe: self.timeframe,
                    timestamp: tick.timestamp,
                    last_accepted: last,
                });
            }
        }
        self.last_tick_ts = Some(tick.timestamp);

        let window = self.timeframe.window_start(tick.timestamp);
        match self.open_candle.as_mut() {
            Some(candle) if candle.open_time == window => {
                candle.apply_tick(tick);
                Ok(None)
            }
            Some(_) => {
                // Tick opens a later window; the ordering check above rules
                // out an earlier one.
                let closed = self.open_candle.take();
                self.open_candle = Some(Candle::from_tick(tick, self.timeframe));
                Ok(closed)
            }
            None => {
                self.open_candle = Some(Candle::from_tick(tick, self.timeframe));
                Ok(None)
            }
        }
    }

    /// The currently open candle, if any
    pub fn open_candle(&self) -> Option<&Candle> {
        self.open_candle.as_ref()
    }

    /// Seed the ordering watermark, e.g. after a REST backfill, so live
    /// ticks older than the backfilled history are rejected.
    pub fn set_watermark(&mut self, ts: DateTime<Utc>) {
        self.last_tick_ts = Some(ts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn tick(ts_secs: i64, price: Decimal, volume: Decimal) -> Tick {
        Tick {
            symbol: "BTCUSDT".to_string(),
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            price,
            volume,
        }
    }

    #[test]
    fn test_first_tick_opens_candle() {
        let mut agg = CandleAggregator::new("BTCUSDT", Timeframe::M1);
        let closed = agg.on_tick(&tick(1_700_000_000, dec!(100), dec!(1))).unwrap();
        assert!(closed.is_none());
        assert!(agg.open_candle().is_some());
    }

    #[test]
    fn test_single_open_candle_per_window() {
        let mut agg = CandleAggregator::new("BTCUSDT", Timeframe::M1);
        agg.on_tick(&tick(1_700_000_000, dec!(100), dec!(1))).unwrap();
        agg.on_tick(&tick(1_700_000_030, dec!(101), dec!(1))).unwrap();

        let open = agg.open_candle().unwrap();
        assert_eq!(open.close, dec!(101));
        assert_eq!(open.volume, dec!(2));
    }

    #[test]
    fn test_window_boundary_closes_candle() {
        let mut agg = CandleAggregator::new("BTCUSDT", Timeframe::M1);
        agg.on_tick(&tick(1_700_000_000, dec!(100), dec!(1))).unwrap();
        agg.on_tick(&tick(1_700_000_059, dec!(102), dec!(2))).unwrap();

        let closed = agg
            .on_tick(&tick(1_700_000_060, dec!(103), dec!(1)))
            .unwrap()
            .expect("boundary tick should close the candle");

        assert_eq!(closed.open, dec!(100));
        assert_eq!(closed.close, dec!(102));
        assert_eq!(closed.volume, dec!(3));
        assert_eq!(agg.open_candle().unwrap().open, dec!(103));
    }

    #[test]
    fn test_gap_skips_windows_without_synthetic_candles() {
        let mut agg = CandleAggregator::new("BTCUSDT", Timeframe::M1);
        agg.on_tick(&tick(1_700_000_000, dec!(100), dec!(1))).unwrap();

        // Next tick three windows later: one close, no filler candles
        let closed = agg
            .on_tick(&tick(1_700_000_185, dec!(99), dec!(1)))
            .unwrap()
            .unwrap();
        assert_eq!(closed.open_time.timestamp(), 1_700_000_000 - 1_700_000_000 % 60);
        assert_eq!(
            agg.open_candle().unwrap().open_time.timestamp() % 60,
            0
        );
    }

    #[test]
    fn test_out_of_order_tick_rejected() {
        let mut agg = CandleAggregator::new("BTCUSDT", Timeframe::M1);
        agg.on_tick(&tick(1_700_000_030, dec!(100), dec!(1))).unwrap();

        let err = agg.on_tick(&tick(1_700_000_029, dec!(101), dec!(1)));
        assert!(matches!(err, Err(AggregateError::OutOfOrder { .. })));

        // State untouched by the rejected tick
        let open = agg.open_candle().unwrap();
        assert_eq!(open.close, dec!(100));
        assert_eq!(open.volume, dec!(1));
    }

    #[test]
    fn test_equal_timestamp_accepted() {
        let mut agg = CandleAggregator::new("BTCUSDT", Timeframe::M1);
        agg.on_tick(&tick(1_700_000_030, dec!(100), dec!(1))).unwrap();
        agg.on_tick(&tick(1_700_000_030, dec!(101), dec!(1))).unwrap();
        assert_eq!(agg.open_candle().unwrap().volume, dec!(2));
    }

    #[test]
    fn test_symbol_mismatch_rejected() {
        let mut agg = CandleAggregator::new("BTCUSDT", Timeframe::M1);
        let mut t = tick(1_700_000_000, dec!(100), dec!(1));
        t.symbol = "ETHUSDT".to_string();
        assert!(matches!(
            agg.on_tick(&t),
            Err(AggregateError::SymbolMismatch { .. })
        ));
    }

    #[test]
    fn test_watermark_rejects_stale_live_ticks() {
        let mut agg = CandleAggregator::new("BTCUSDT", Timeframe::M1);
        agg.set_watermark(Utc.timestamp_opt(1_700_000_100, 0).unwrap());

        let err = agg.on_tick(&tick(1_700_000_050, dec!(100), dec!(1)));
        assert!(matches!(err, Err(AggregateError::OutOfOrder { .. })));
    }
}
