//! Signal types

use crate::profile::VolumeProfile;
use crate::trend::{CompositeTrend, TrendDirection};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of emitted signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Long entry
    Buy,
    /// Short entry
    Sell,
}

impl SignalKind {
    /// Map a directional trend to a signal kind; Range maps to none
    pub fn from_direction(direction: TrendDirection) -> Option<SignalKind> {
        match direction {
            TrendDirection::Up => Some(SignalKind::Buy),
            TrendDirection::Down => Some(SignalKind::Sell),
            TrendDirection::Range => None,
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Buy => f.write_str("buy"),
            SignalKind::Sell => f.write_str("sell"),
        }
    }
}

/// An emitted trading signal
///
/// Immutable once created; carries the analytic evidence that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Unique signal identifier
    pub id: Uuid,
    /// Trading symbol
    pub symbol: String,
    /// Buy or sell
    pub kind: SignalKind,
    /// Composite confidence at emission, in [0, 1]
    pub confidence: Decimal,
    /// Price at the confirming candle close
    pub price: Decimal,
    /// Volume profile that confirmed the signal
    pub profile: VolumeProfile,
    /// Composite trend that confirmed the signal
    pub composite: CompositeTrend,
    /// Emission timestamp (close time of the confirming candle)
    pub emitted_at: DateTime<Utc>,
}
