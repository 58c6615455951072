//! Timeframe worker
//!
//! One worker per (symbol, timeframe) exclusively owns that pair's candle
//! aggregation, volume profile and trend state. Errors stay local to the
//! worker: a rejected update never touches another pair's state.

use crate::feed::{Candle, CandleAggregator, Tick, Timeframe};
use crate::profile::{ProfileParams, VolumeProfile, VolumeProfileEngine};
use crate::telemetry;
use crate::trend::{TrendDetector, TrendError, TrendParams, TrendState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Candle-close event forwarded to the symbol coordinator
#[derive(Debug, Clone)]
pub struct CandleCloseEvent {
    /// The closed candle
    pub candle: Candle,
    /// Trend state recomputed from this close, if enough history
    pub trend: Option<TrendState>,
    /// Profile snapshot after this close, if the window is full
    pub profile: Option<VolumeProfile>,
}

/// Worker owning the analytic state for one (symbol, timeframe)
pub struct TimeframeWorker {
    symbol: String,
    timeframe: Timeframe,
    aggregator: CandleAggregator,
    profile: VolumeProfileEngine,
    trend: TrendDetector,
}

impl TimeframeWorker {
    /// Create a worker for one (symbol, timeframe) pair
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        profile_params: ProfileParams,
        trend_params: TrendParams,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            aggregator: CandleAggregator::new(symbol.clone(), timeframe),
            profile: VolumeProfileEngine::new(symbol.clone(), timeframe, profile_params),
            trend: TrendDetector::new(symbol.clone(), timeframe, trend_params),
            symbol,
            timeframe,
        }
    }

    /// Closed candles wanted by a backfill to warm both windows
    pub fn backfill_target(&self) -> usize {
        self.trend.required_history().max(self.profile.window_target()) + 1
    }

    /// Warm the analytic windows from historical closed candles
    ///
    /// Returns the number of accepted candles. Out-of-order rows are
    /// skipped; the live watermark advances to the last accepted candle so
    /// stale ticks cannot rewind history.
    pub fn backfill(&mut self, candles: &[Candle]) -> usize {
        let mut accepted = 0;
        for candle in candles {
            if self.profile.ingest(candle).is_err() {
                continue;
            }
            let _ = self.trend.on_candle_close(candle);
            self.aggregator.set_watermark(candle.close_time());
            accepted += 1;
        }
        tracing::debug!(
            symbol = %self.symbol,
            timeframe = %self.timeframe,
            accepted,
            "backfill applied"
        );
        accepted
    }

    /// Fold one tick; produces an event when it closes a candle
    pub fn on_tick(&mut self, tick: &Tick) -> Option<CandleCloseEvent> {
        match self.aggregator.on_tick(tick) {
            Ok(Some(closed)) => Some(self.on_closed_candle(closed)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    symbol = %self.symbol,
                    timeframe = %self.timeframe,
                    error = %e,
                    "tick rejected"
                );
                telemetry::record_ingest_rejected(&self.symbol, self.timeframe);
                None
            }
        }
    }

    fn on_closed_candle(&mut self, candle: Candle) -> CandleCloseEvent {
        if let Err(e) = self.profile.ingest(&candle) {
            tracing::warn!(
                symbol = %self.symbol,
                timeframe = %self.timeframe,
                error = %e,
                "candle rejected by volume profile"
            );
            telemetry::record_ingest_rejected(&self.symbol, self.timeframe);
        }

        let trend = match self.trend.on_candle_close(&candle) {
            Ok(state) => Some(state),
            Err(TrendError::InsufficientData { have, need }) => {
                tracing::debug!(
                    symbol = %self.symbol,
                    timeframe = %self.timeframe,
                    have,
                    need,
                    "trend warming up"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    symbol = %self.symbol,
                    timeframe = %self.timeframe,
                    error = %e,
                    "candle rejected by trend detector"
                );
                telemetry::record_ingest_rejected(&self.symbol, self.timeframe);
                None
            }
        };

        CandleCloseEvent {
            profile: self.profile.snapshot().ok(),
            candle,
            trend,
        }
    }

    /// Process the tick stream until cancellation or channel close
    pub async fn run(
        mut self,
        mut ticks: mpsc::Receiver<Tick>,
        events: mpsc::Sender<CandleCloseEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                tick = ticks.recv() => match tick {
                    Some(tick) => {
                        if let Some(event) = self.on_tick(&tick) {
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => break,
                },
            }
        }
        tracing::debug!(symbol = %self.symbol, timeframe = %self.timeframe, "worker stopped");
    }
}
