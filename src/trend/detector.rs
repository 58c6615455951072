//! Per-timeframe trend detection
//!
//! Classifies direction from moving-average alignment and scores strength
//! from MA separation, RSI displacement and volume confirmation.

use super::indicators::{ema, rsi, sma};
use super::types::{TrendDirection, TrendError, TrendState};
use crate::feed::{Candle, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Trend detection parameters
#[derive(Debug, Clone)]
pub struct TrendParams {
    /// Fast EMA period
    pub fast_period: usize,
    /// Slow EMA period
    pub slow_period: usize,
    /// RSI period
    pub rsi_period: usize,
    /// SMA period for the volume baseline
    pub volume_sma_period: usize,
    /// Volume ratio considered fully confirming
    pub volume_confirmation: Decimal,
}

impl Default for TrendParams {
    fn default() -> Self {
        Self {
            fast_period: 20,
            slow_period: 50,
            rsi_period: 14,
            volume_sma_period: 20,
            volume_confirmation: dec!(1.15),
        }
    }
}

/// MA separation of 0.5% scores as fully trending
const FULL_SEPARATION: Decimal = dec!(0.005);

/// Trend detector for one (symbol, timeframe)
pub struct TrendDetector {
    symbol: String,
    timeframe: Timeframe,
    params: TrendParams,
    closes: Vec<Decimal>,
    volumes: Vec<Decimal>,
    last_open_time: Option<DateTime<Utc>>,
    current: Option<TrendState>,
}

impl TrendDetector {
    /// Create a detector for one (symbol, timeframe) pair
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, params: TrendParams) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            params,
            closes: Vec::new(),
            volumes: Vec::new(),
            last_open_time: None,
            current: None,
        }
    }

    /// Closed candles required before a classification is produced
    pub fn required_history(&self) -> usize {
        self.params.slow_period + 1
    }

    /// Consume a closed candle and recompute the trend state
    ///
    /// The returned state atomically supersedes the previous one. Candles
    /// not strictly after the last accepted open time are rejected and the
    /// prior state is left untouched.
    pub fn on_candle_close(&mut self, candle: &Candle) -> Result<TrendState, TrendError> {
        if let Some(last) = self.last_open_time {
            if candle.open_time <= last {
                return Err(TrendError::OrderingViolation {
                    symbol: self.symbol.clone(),
                    timeframe: self.timeframe,
                    open_time: candle.open_time,
                    last_open_time: last,
                });
            }
        }
        self.last_open_time = Some(candle.open_time);

        self.closes.push(candle.close);
        self.volumes.push(candle.volume);
        let cap = self.params.slow_period * 2 + 1;
        if self.closes.len() > cap {
            self.closes.remove(0);
            self.volumes.remove(0);
        }

        if self.closes.len() < self.required_history() {
            return Err(TrendError::InsufficientData {
                have: self.closes.len(),
                need: self.required_history(),
            });
        }

        let state = self.classify(candle);
        self.current = Some(state.clone());
        Ok(state)
    }

    /// Latest trend state, if one has been computed
    pub fn current(&self) -> Option<&TrendState> {
        self.current.as_ref()
    }

    fn classify(&self, candle: &Candle) -> TrendState {
        let ema_fast = ema(&self.closes, self.params.fast_period).expect("history checked");
        let ema_slow = ema(&self.closes, self.params.slow_period).expect("history checked");
        let rsi_v = rsi(&self.closes, self.params.rsi_period);
        let close = candle.close;

        let direction = if close > ema_fast && ema_fast > ema_slow {
            TrendDirection::Up
        } else if close < ema_fast && ema_fast < ema_slow {
            TrendDirection::Down
        } else {
            TrendDirection::Range
        };

        let strength = if direction.is_directional() {
            self.strength(direction, ema_fast, ema_slow, rsi_v, candle.volume)
        } else {
            Decimal::ZERO
        };

        TrendState {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            direction,
            strength,
            computed_at: candle.close_time(),
        }
    }

    /// Strength = 0.4 MA separation + 0.3 RSI displacement + 0.3 volume
    /// confirmation, each component clamped to [0, 1].
    fn strength(
        &self,
        direction: TrendDirection,
        ema_fast: Decimal,
        ema_slow: Decimal,
        rsi_v: Decimal,
        volume: Decimal,
    ) -> Decimal {
        let separation = if ema_slow.is_zero() {
            Decimal::ZERO
        } else {
            ((ema_fast - ema_slow) / ema_slow).abs()
        };
        let sep_score = (separation / FULL_SEPARATION).min(Decimal::ONE);

        let displacement = match direction {
            TrendDirection::Up => rsi_v - dec!(50),
            TrendDirection::Down => dec!(50) - rsi_v,
            TrendDirection::Range => Decimal::ZERO,
        };
        let rsi_score = (displacement / dec!(25)).clamp(Decimal::ZERO, Decimal::ONE);

        // Baseline excludes the current candle, as in a trailing average
        let history = &self.volumes[..self.volumes.len() - 1];
        let vol_score = match sma(history, self.params.volume_sma_period) {
            Some(baseline) if !baseline.is_zero() => {
                (volume / baseline / self.params.volume_confirmation).min(Decimal::ONE)
            }
            _ => Decimal::ZERO,
        };

        (sep_score * dec!(0.4) + rsi_score * dec!(0.3) + vol_score * dec!(0.3))
            .clamp(Decimal::ZERO, Decimal::ONE)
    }
}
