//! Multi-timeframe trend fusion
//!
//! Combines the latest per-timeframe trend states into one composite
//! verdict. Longer timeframes carry proportionally more weight; without a
//! directional majority or the configured quorum the verdict is not
//! actionable.

use super::types::{CompositeTrend, TrendDirection, TrendState};
use crate::feed::Timeframe;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Aggregation parameters
#[derive(Debug, Clone)]
pub struct AggregatorParams {
    /// Minimum number of agreeing directional timeframes for a non-zero
    /// confidence
    pub min_agreeing_timeframes: usize,
}

impl Default for AggregatorParams {
    fn default() -> Self {
        Self {
            min_agreeing_timeframes: 2,
        }
    }
}

/// Fuses per-timeframe trend states for one symbol
pub struct MultiTimeframeAggregator {
    symbol: String,
    params: AggregatorParams,
    states: BTreeMap<Timeframe, TrendState>,
}

impl MultiTimeframeAggregator {
    /// Create an aggregator for one symbol
    pub fn new(symbol: impl Into<String>, params: AggregatorParams) -> Self {
        Self {
            symbol: symbol.into(),
            params,
            states: BTreeMap::new(),
        }
    }

    /// Record the latest trend state for its timeframe
    pub fn update(&mut self, state: TrendState) {
        debug_assert_eq!(state.symbol, self.symbol);
        self.states.insert(state.timeframe, state);
    }

    /// Number of timeframes with a recorded state
    pub fn timeframe_count(&self) -> usize {
        self.states.len()
    }

    /// Compute the composite verdict
    ///
    /// Deterministic in the current state set: each timeframe is weighted by
    /// its duration, the heavier directional side wins, and confidence is
    /// the agreeing weight share times the weight-averaged strength of the
    /// agreeing states. An equal split (including all-Range) yields Range
    /// with zero confidence, as does a majority below the quorum.
    pub fn composite(&self) -> CompositeTrend {
        let weight = |tf: Timeframe| Decimal::from(tf.duration_secs());

        let total: Decimal = self.states.keys().map(|&tf| weight(tf)).sum();
        if total.is_zero() {
            return self.not_actionable();
        }

        let mut up_weight = Decimal::ZERO;
        let mut down_weight = Decimal::ZERO;
        for state in self.states.values() {
            match state.direction {
                TrendDirection::Up => up_weight += weight(state.timeframe),
                TrendDirection::Down => down_weight += weight(state.timeframe),
                TrendDirection::Range => {}
            }
        }

        let direction = if up_weight > down_weight {
            TrendDirection::Up
        } else if down_weight > up_weight {
            TrendDirection::Down
        } else {
            return self.not_actionable();
        };

        let agreeing: Vec<&TrendState> = self
            .states
            .values()
            .filter(|s| s.direction == direction)
            .collect();
        if agreeing.len() < self.params.min_agreeing_timeframes {
            return self.not_actionable();
        }

        let agreeing_weight: Decimal = agreeing.iter().map(|s| weight(s.timeframe)).sum();
        let weighted_strength: Decimal = agreeing
            .iter()
            .map(|s| s.strength * weight(s.timeframe))
            .sum::<Decimal>()
            / agreeing_weight;

        CompositeTrend {
            symbol: self.symbol.clone(),
            direction,
            confidence: (agreeing_weight / total * weighted_strength)
                .clamp(Decimal::ZERO, Decimal::ONE),
            contributing: agreeing.iter().map(|s| s.timeframe).collect(),
        }
    }

    fn not_actionable(&self) -> CompositeTrend {
        CompositeTrend {
            symbol: self.symbol.clone(),
            direction: TrendDirection::Range,
            confidence: Decimal::ZERO,
            contributing: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn state(tf: Timeframe, direction: TrendDirection, strength: Decimal) -> TrendState {
        TrendState {
            symbol: "BTCUSDT".to_string(),
            timeframe: tf,
            direction,
            strength,
            computed_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    fn aggregator(min_agreeing: usize) -> MultiTimeframeAggregator {
        MultiTimeframeAggregator::new(
            "BTCUSDT",
            AggregatorParams {
                min_agreeing_timeframes: min_agreeing,
            },
        )
    }

    #[test]
    fn test_empty_yields_range_zero() {
        let agg = aggregator(2);
        let composite = agg.composite();
        assert_eq!(composite.direction, TrendDirection::Range);
        assert_eq!(composite.confidence, Decimal::ZERO);
        assert!(composite.contributing.is_empty());
    }

    #[test]
    fn test_unanimous_uptrend() {
        let mut agg = aggregator(2);
        agg.update(state(Timeframe::M5, TrendDirection::Up, dec!(0.8)));
        agg.update(state(Timeframe::M15, TrendDirection::Up, dec!(0.9)));
        agg.update(state(Timeframe::H1, TrendDirection::Up, dec!(0.7)));

        let composite = agg.composite();
        assert_eq!(composite.direction, TrendDirection::Up);
        // Full weight share, so confidence equals the weighted strength
        assert!(composite.confidence > dec!(0.7));
        assert_eq!(
            composite.contributing,
            vec![Timeframe::M5, Timeframe::M15, Timeframe::H1]
        );
    }

    #[test]
    fn test_longer_timeframes_dominate() {
        let mut agg = aggregator(1);
        // One H1 up outweighs M5 + M15 down (3600 > 300 + 900)
        agg.update(state(Timeframe::M5, TrendDirection::Down, dec!(1)));
        agg.update(state(Timeframe::M15, TrendDirection::Down, dec!(1)));
        agg.update(state(Timeframe::H1, TrendDirection::Up, dec!(1)));

        let composite = agg.composite();
        assert_eq!(composite.direction, TrendDirection::Up);
        assert_eq!(composite.contributing, vec![Timeframe::H1]);
    }

    #[test]
    fn test_all_range_is_not_actionable() {
        let mut agg = aggregator(1);
        agg.update(state(Timeframe::M5, TrendDirection::Range, dec!(0)));
        agg.update(state(Timeframe::M15, TrendDirection::Range, dec!(0)));

        let composite = agg.composite();
        assert_eq!(composite.direction, TrendDirection::Range);
        assert_eq!(composite.confidence, Decimal::ZERO);
        assert!(composite.contributing.is_empty());
    }

    #[test]
    fn test_quorum_required() {
        let mut agg = aggregator(2);
        agg.update(state(Timeframe::H1, TrendDirection::Up, dec!(0.9)));
        agg.update(state(Timeframe::M5, TrendDirection::Range, dec!(0)));

        let composite = agg.composite();
        assert_eq!(composite.confidence, Decimal::ZERO);
        assert_eq!(composite.direction, TrendDirection::Range);
    }

    #[test]
    fn test_disagreement_lowers_confidence() {
        let mut unanimous = aggregator(2);
        unanimous.update(state(Timeframe::M5, TrendDirection::Up, dec!(0.8)));
        unanimous.update(state(Timeframe::M15, TrendDirection::Up, dec!(0.8)));
        unanimous.update(state(Timeframe::H1, TrendDirection::Up, dec!(0.8)));

        let mut split = aggregator(2);
        split.update(state(Timeframe::M5, TrendDirection::Down, dec!(0.8)));
        split.update(state(Timeframe::M15, TrendDirection::Up, dec!(0.8)));
        split.update(state(Timeframe::H1, TrendDirection::Up, dec!(0.8)));

        assert!(split.composite().confidence < unanimous.composite().confidence);
    }

    #[test]
    fn test_composite_is_deterministic() {
        let mut agg = aggregator(2);
        agg.update(state(Timeframe::M5, TrendDirection::Up, dec!(0.61)));
        agg.update(state(Timeframe::M15, TrendDirection::Up, dec!(0.83)));
        agg.update(state(Timeframe::H1, TrendDirection::Down, dec!(0.4)));

        let a = agg.composite();
        let b = agg.composite();
        assert_eq!(a.direction, b.direction);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.contributing, b.contributing);
    }

    #[test]
    fn test_update_replaces_prior_state_atomically() {
        let mut agg = aggregator(1);
        agg.update(state(Timeframe::M5, TrendDirection::Up, dec!(0.9)));
        agg.update(state(Timeframe::M5, TrendDirection::Down, dec!(0.5)));

        assert_eq!(agg.timeframe_count(), 1);
        let composite = agg.composite();
        assert_eq!(composite.direction, TrendDirection::Down);
    }
}
