//! Trend types

use crate::feed::Timeframe;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trend analysis errors
#[derive(Debug, Clone, Error)]
pub enum TrendError {
    /// Candle arrived out of order or duplicated an accepted open time
    #[error("ordering violation for {symbol} {timeframe}: candle {open_time} not after {last_open_time}")]
    OrderingViolation {
        symbol: String,
        timeframe: Timeframe,
        open_time: DateTime<Utc>,
        last_open_time: DateTime<Utc>,
    },
    /// Not enough closed candles for the slow indicator period
    #[error("insufficient data: {have}/{need} closed candles")]
    InsufficientData { have: usize, need: usize },
}

/// Directional classification of one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    /// Price above both moving averages, fast above slow
    Up,
    /// Price below both moving averages, fast below slow
    Down,
    /// No directional alignment
    Range,
}

impl TrendDirection {
    /// The opposing directional state; Range has none
    pub fn opposite(&self) -> TrendDirection {
        match self {
            TrendDirection::Up => TrendDirection::Down,
            TrendDirection::Down => TrendDirection::Up,
            TrendDirection::Range => TrendDirection::Range,
        }
    }

    /// Whether this is a directional (non-Range) state
    pub fn is_directional(&self) -> bool {
        !matches!(self, TrendDirection::Range)
    }
}

/// Current trend classification for one (symbol, timeframe)
///
/// Replaced wholesale on every closed candle; never partially updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendState {
    /// Trading symbol
    pub symbol: String,
    /// Timeframe the classification applies to
    pub timeframe: Timeframe,
    /// Directional state
    pub direction: TrendDirection,
    /// Strength in [0, 1]
    pub strength: Decimal,
    /// Close time of the candle that produced this state
    pub computed_at: DateTime<Utc>,
}

/// Confidence-weighted fusion of the per-timeframe trend states
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeTrend {
    /// Trading symbol
    pub symbol: String,
    /// Majority direction, or Range when timeframes disagree
    pub direction: TrendDirection,
    /// Confidence in [0, 1]; zero without a directional majority or quorum
    pub confidence: Decimal,
    /// Timeframes agreeing with the majority direction, ascending
    pub contributing: Vec<Timeframe>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_opposite() {
        assert_eq!(TrendDirection::Up.opposite(), TrendDirection::Down);
        assert_eq!(TrendDirection::Down.opposite(), TrendDirection::Up);
        assert_eq!(TrendDirection::Range.opposite(), TrendDirection::Range);
    }

    #[test]
    fn test_direction_is_directional() {
        assert!(TrendDirection::Up.is_directional());
        assert!(TrendDirection::Down.is_directional());
        assert!(!TrendDirection::Range.is_directional());
    }

    #[test]
    fn test_direction_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&TrendDirection::Up).unwrap(),
            "\"up\""
        );
        assert_eq!(
            serde_json::to_string(&TrendDirection::Range).unwrap(),
            "\"range\""
        );
    }
}
