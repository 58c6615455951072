//! Symbol coordinator
//!
//! Single writer for one symbol's aggregator and signal engine. All of the
//! symbol's timeframe workers funnel candle-close events through one
//! channel, so composite recomputation and signal evaluation are serialized
//! without locks.

use super::worker::CandleCloseEvent;
use crate::feed::Timeframe;
use crate::signal::{Signal, SignalEngine, SignalParams};
use crate::telemetry;
use crate::trend::{AggregatorParams, MultiTimeframeAggregator};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Per-symbol fusion and signal evaluation
pub struct SymbolCoordinator {
    symbol: String,
    signal_timeframe: Timeframe,
    aggregator: MultiTimeframeAggregator,
    engine: SignalEngine,
}

impl SymbolCoordinator {
    /// Create a coordinator for one symbol
    pub fn new(
        symbol: impl Into<String>,
        signal_timeframe: Timeframe,
        aggregator_params: AggregatorParams,
        signal_params: SignalParams,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            aggregator: MultiTimeframeAggregator::new(symbol.clone(), aggregator_params),
            engine: SignalEngine::new(symbol.clone(), signal_params),
            symbol,
            signal_timeframe,
        }
    }

    /// Fold one candle-close event; may emit a signal
    ///
    /// Every trend update triggers a composite recompute; the signal state
    /// machine only steps on closes of the signal timeframe.
    pub fn on_event(&mut self, event: CandleCloseEvent) -> Option<Signal> {
        if let Some(trend) = event.trend {
            self.aggregator.update(trend);
        }

        if event.candle.timeframe != self.signal_timeframe {
            return None;
        }

        let composite = self.aggregator.composite();
        self.engine
            .evaluate(&event.candle, &composite, event.profile.as_ref())
    }

    /// Process events until cancellation or channel close
    ///
    /// Emission to the notification queue is non-blocking: a full queue
    /// drops the signal with a warning rather than stalling analytics.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<CandleCloseEvent>,
        signals: mpsc::Sender<Signal>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        if let Some(signal) = self.on_event(event) {
                            tracing::info!(
                                symbol = %signal.symbol,
                                kind = %signal.kind,
                                confidence = %signal.confidence,
                                price = %signal.price,
                                "signal emitted"
                            );
                            telemetry::record_signal_emitted(&signal.symbol, signal.kind);
                            if signals.try_send(signal).is_err() {
                                tracing::warn!(symbol = %self.symbol, "signal queue full, dropping");
                            }
                        }
                    }
                    None => break,
                },
            }
        }
        tracing::debug!(symbol = %self.symbol, "coordinator stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Candle;
    use crate::profile::{VolumeNode, VolumeProfile};
    use crate::signal::SignalKind;
    use crate::trend::{TrendDirection, TrendState};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn candle(minute: i64, timeframe: Timeframe, close: Decimal) -> Candle {
        Candle {
            symbol: "BTCUSDT".to_string(),
            timeframe,
            open_time: Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(5),
        }
    }

    fn trend(tf: Timeframe, direction: TrendDirection, minute: i64) -> TrendState {
        TrendState {
            symbol: "BTCUSDT".to_string(),
            timeframe: tf,
            direction,
            strength: dec!(0.9),
            computed_at: Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap(),
        }
    }

    fn profile_at(price: Decimal) -> VolumeProfile {
        let node = VolumeNode {
            price,
            volume: dec!(100),
        };
        VolumeProfile {
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::M1,
            window_candles: 3,
            buckets: vec![node.clone()],
            point_of_control: node.clone(),
            high_volume_nodes: vec![node],
            low_volume_nodes: vec![],
        }
    }

    fn coordinator() -> SymbolCoordinator {
        SymbolCoordinator::new(
            "BTCUSDT",
            Timeframe::M1,
            AggregatorParams {
                min_agreeing_timeframes: 2,
            },
            SignalParams {
                actionable_confidence: dec!(0.3),
                node_proximity_pct: dec!(0.05),
                cooldown_secs: 600,
                cooldown_candles: 2,
            },
        )
    }

    fn event(
        minute: i64,
        tf: Timeframe,
        direction: Option<TrendDirection>,
        with_profile: bool,
    ) -> CandleCloseEvent {
        CandleCloseEvent {
            candle: candle(minute, tf, dec!(100)),
            trend: direction.map(|d| trend(tf, d, minute)),
            profile: with_profile.then(|| profile_at(dec!(100))),
        }
    }

    #[test]
    fn test_signal_after_two_agreeing_timeframes_and_confirmation() {
        let mut coord = coordinator();

        // M3 worker reports up; no signal (not the signal timeframe)
        assert!(coord
            .on_event(event(0, Timeframe::M3, Some(TrendDirection::Up), false))
            .is_none());

        // First M1 close with full evidence arms
        assert!(coord
            .on_event(event(1, Timeframe::M1, Some(TrendDirection::Up), true))
            .is_none());

        // Second M1 close confirms and fires
        let signal = coord
            .on_event(event(2, Timeframe::M1, Some(TrendDirection::Up), true))
            .expect("confirmation fires");
        assert_eq!(signal.kind, SignalKind::Buy);
        assert_eq!(signal.symbol, "BTCUSDT");
    }

    #[test]
    fn test_no_signal_without_quorum() {
        let mut coord = coordinator();

        // Only the M1 timeframe reports; quorum of 2 is unmet
        assert!(coord
            .on_event(event(0, Timeframe::M1, Some(TrendDirection::Up), true))
            .is_none());
        assert!(coord
            .on_event(event(1, Timeframe::M1, Some(TrendDirection::Up), true))
            .is_none());
        assert!(coord
            .on_event(event(2, Timeframe::M1, Some(TrendDirection::Up), true))
            .is_none());
    }

    #[test]
    fn test_non_signal_timeframe_never_evaluates() {
        let mut coord = coordinator();
        coord.on_event(event(0, Timeframe::M3, Some(TrendDirection::Up), false));

        // Plenty of M3 closes with full evidence: still no signal
        for minute in 1..6 {
            assert!(coord
                .on_event(event(minute, Timeframe::M3, Some(TrendDirection::Up), true))
                .is_none());
        }
    }

    #[test]
    fn test_missing_profile_keeps_idle() {
        let mut coord = coordinator();
        coord.on_event(event(0, Timeframe::M3, Some(TrendDirection::Up), false));

        for minute in 1..5 {
            assert!(coord
                .on_event(event(minute, Timeframe::M1, Some(TrendDirection::Up), false))
                .is_none());
        }
    }

    #[tokio::test]
    async fn test_run_loop_emits_to_signal_channel() {
        let coord = coordinator();
        let (event_tx, event_rx) = mpsc::channel(16);
        let (signal_tx, mut signal_rx) = mpsc::channel(16);
        let token = CancellationToken::new();

        let handle = tokio::spawn(coord.run(event_rx, signal_tx, token.clone()));

        event_tx
            .send(event(0, Timeframe::M3, Some(TrendDirection::Up), false))
            .await
            .unwrap();
        event_tx
            .send(event(1, Timeframe::M1, Some(TrendDirection::Up), true))
            .await
            .unwrap();
        event_tx
            .send(event(2, Timeframe::M1, Some(TrendDirection::Up), true))
            .await
            .unwrap();

        let signal = signal_rx.recv().await.unwrap();
        assert_eq!(signal.kind, SignalKind::Buy);

        token.cancel();
        handle.await.unwrap();
    }
}
