//! Per-symbol signal state machine
//!
//! States: Idle -> Armed -> (fire) -> Cooldown -> Idle. Arming requires an
//! actionable composite trend while price sits near a high-volume node; the
//! confirmation must persist across the next candle close before a signal
//! fires. A contrary confirmation while Armed cancels without firing.

use super::types::{Signal, SignalKind};
use crate::feed::Candle;
use crate::profile::VolumeProfile;
use crate::trend::{CompositeTrend, TrendDirection};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Signal engine parameters
#[derive(Debug, Clone)]
pub struct SignalParams {
    /// Composite confidence required to arm
    pub actionable_confidence: Decimal,
    /// Maximum relative distance from a high-volume node
    pub node_proximity_pct: Decimal,
    /// Cooldown dwell in wall-clock seconds
    pub cooldown_secs: u64,
    /// Cooldown dwell in candle closes; whichever elapses first wins
    pub cooldown_candles: u32,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            actionable_confidence: dec!(0.70),
            node_proximity_pct: dec!(0.005),
            cooldown_secs: 900,
            cooldown_candles: 3,
        }
    }
}

/// Externally visible phase of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPhase {
    Idle,
    Armed,
    Cooldown,
}

#[derive(Clone, Copy)]
enum State {
    Idle,
    Armed {
        direction: TrendDirection,
    },
    Cooldown {
        since: DateTime<Utc>,
        closes_seen: u32,
    },
}

/// Signal state machine for one symbol
pub struct SignalEngine {
    symbol: String,
    params: SignalParams,
    state: State,
    last_emitted: Option<(SignalKind, DateTime<Utc>)>,
}

impl SignalEngine {
    /// Create an engine for one symbol
    pub fn new(symbol: impl Into<String>, params: SignalParams) -> Self {
        Self {
            symbol: symbol.into(),
            params,
            state: State::Idle,
            last_emitted: None,
        }
    }

    /// Current phase, for observability and tests
    pub fn phase(&self) -> SignalPhase {
        match self.state {
            State::Idle => SignalPhase::Idle,
            State::Armed { .. } => SignalPhase::Armed,
            State::Cooldown { .. } => SignalPhase::Cooldown,
        }
    }

    /// Evaluate one candle close of the signal timeframe
    ///
    /// Driven entirely by event time (the candle's close time), so the
    /// machine is deterministic and `emitted_at` is monotonic per symbol.
    /// A missing profile (window unfilled) never arms.
    pub fn evaluate(
        &mut self,
        candle: &Candle,
        composite: &CompositeTrend,
        profile: Option<&VolumeProfile>,
    ) -> Option<Signal> {
        let now = candle.close_time();
        let confirmation = self.confirmation(candle, composite, profile);

        // Cooldown expiry is checked first so an expiring close can re-arm
        // in the same evaluation.
        if let State::Cooldown { since, closes_seen } = self.state {
            let closes_seen = closes_seen + 1;
            let dwell_elapsed =
                now - since >= Duration::seconds(self.params.cooldown_secs as i64);
            self.state = if dwell_elapsed || closes_seen >= self.params.cooldown_candles {
                State::Idle
            } else {
                State::Cooldown { since, closes_seen }
            };
        }

        match self.state {
            State::Idle => {
                if let Some(direction) = confirmation {
                    self.state = State::Armed { direction };
                }
                None
            }
            State::Armed { direction } => {
                match confirmation {
                    Some(dir) if dir == direction => {
                        self.state = State::Cooldown {
                            since: now,
                            closes_seen: 0,
                        };
                        self.fire(direction, candle, composite, profile, now)
                    }
                    // Contrary confirmation or vanished evidence: disarm
                    _ => {
                        self.state = State::Idle;
                        None
                    }
                }
            }
            State::Cooldown { .. } => None,
        }
    }

    /// The confirmation condition: actionable composite confidence with the
    /// close near a high-volume node. Conflicting evidence has already been
    /// collapsed to Range by the aggregator, which yields no confirmation.
    fn confirmation(
        &self,
        candle: &Candle,
        composite: &CompositeTrend,
        profile: Option<&VolumeProfile>,
    ) -> Option<TrendDirection> {
        let profile = profile?;
        if !composite.direction.is_directional() {
            return None;
        }
        if composite.confidence < self.params.actionable_confidence {
            return None;
        }
        if !profile.is_near_high_volume_node(candle.close, self.params.node_proximity_pct) {
            return None;
        }
        Some(composite.direction)
    }

    fn fire(
        &mut self,
        direction: TrendDirection,
        candle: &Candle,
        composite: &CompositeTrend,
        profile: Option<&VolumeProfile>,
        now: DateTime<Utc>,
    ) -> Option<Signal> {
        let kind = SignalKind::from_direction(direction)?;
        let profile = profile?;

        // Debounce invariant: emission is strictly monotonic per symbol and
        // never repeats a kind within the cooldown dwell.
        if let Some((last_kind, last_at)) = self.last_emitted {
            if now <= last_at {
                return None;
            }
            if last_kind == kind
                && now - last_at < Duration::seconds(self.params.cooldown_secs as i64)
            {
                return None;
            }
        }

        self.last_emitted = Some((kind, now));
        Some(Signal {
            id: Uuid::new_v4(),
            symbol: self.symbol.clone(),
            kind,
            confidence: composite.confidence,
            price: candle.close,
            profile: profile.clone(),
            composite: composite.clone(),
            emitted_at: now,
        })
    }
}
