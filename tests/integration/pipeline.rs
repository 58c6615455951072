//! Analytic pipeline scenarios

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use voltrend::engine::{CandleCloseEvent, Engine, EngineParams, SymbolCoordinator};
use voltrend::feed::{Candle, MarketFeed, Tick, Timeframe};
use voltrend::profile::{ProfileParams, VolumeNode, VolumeProfile};
use voltrend::signal::{SignalKind, SignalParams};
use voltrend::trend::{AggregatorParams, TrendDirection, TrendParams, TrendState};

const BASE_TS: i64 = 1_700_000_100;

fn ts(minute: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(BASE_TS + minute * 60, 0).unwrap()
}

fn tick(minute: i64, price: Decimal) -> Tick {
    Tick {
        symbol: "BTCUSDT".to_string(),
        timestamp: ts(minute),
        price,
        volume: dec!(5),
    }
}

/// Feed that replays a fixed tick script, then idles until dropped
struct ScriptedFeed {
    ticks: Mutex<Option<Vec<Tick>>>,
}

impl ScriptedFeed {
    fn new(ticks: Vec<Tick>) -> Self {
        Self {
            ticks: Mutex::new(Some(ticks)),
        }
    }
}

#[async_trait]
impl MarketFeed for ScriptedFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<Tick>> {
        let ticks = self
            .ticks
            .lock()
            .expect("script lock")
            .take()
            .expect("subscribe called once");
        let (tx, rx) = mpsc::channel(1024);
        tokio::spawn(async move {
            for tick in ticks {
                if tx.send(tick).await.is_err() {
                    return;
                }
            }
            // Keep the stream open so workers idle instead of exiting
            std::future::pending::<()>().await;
        });
        Ok(rx)
    }
}

fn engine_params() -> EngineParams {
    EngineParams {
        symbols: vec!["BTCUSDT".to_string()],
        timeframes: vec![Timeframe::M1, Timeframe::M3],
        signal_timeframe: Timeframe::M1,
        profile: ProfileParams {
            bucket_width: dec!(10),
            window_candles: 4,
            hvn_ratio: dec!(0.5),
            lvn_ratio: dec!(0.1),
        },
        trend: TrendParams {
            fast_period: 3,
            slow_period: 5,
            rsi_period: 3,
            volume_sma_period: 3,
            volume_confirmation: dec!(1.0),
        },
        aggregator: AggregatorParams {
            min_agreeing_timeframes: 2,
        },
        signal: SignalParams {
            actionable_confidence: dec!(0.3),
            node_proximity_pct: dec!(0.05),
            cooldown_secs: 600,
            cooldown_candles: 5,
        },
    }
}

#[tokio::test]
async fn sustained_uptrend_produces_buy_signal_end_to_end() {
    // A steady uptrend: both timeframes classify Up and price always sits
    // near the recent volume cluster
    let ticks: Vec<Tick> = (0..35).map(|m| tick(m, dec!(100) + Decimal::from(m))).collect();
    let feed = Arc::new(ScriptedFeed::new(ticks));

    let (signal_tx, mut signal_rx) = mpsc::channel(64);
    let mut engine = Engine::new(engine_params(), feed, None, signal_tx);
    engine.start().await.unwrap();
    assert_eq!(engine.active_symbols(), vec!["BTCUSDT".to_string()]);

    let signal = tokio::time::timeout(Duration::from_secs(10), signal_rx.recv())
        .await
        .expect("signal within timeout")
        .expect("channel open");

    assert_eq!(signal.symbol, "BTCUSDT");
    assert_eq!(signal.kind, SignalKind::Buy);
    assert!(signal.confidence >= dec!(0.3));
    assert_eq!(signal.composite.direction, TrendDirection::Up);
    assert!(!signal.profile.high_volume_nodes.is_empty());

    engine.shutdown().await;
}

#[tokio::test]
async fn stop_symbol_is_independent() {
    let ticks: Vec<Tick> = (0..3).map(|m| tick(m, dec!(100))).collect();
    let feed = Arc::new(ScriptedFeed::new(ticks));
    let (signal_tx, _signal_rx) = mpsc::channel(8);

    let mut params = engine_params();
    params.symbols = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()];
    let mut engine = Engine::new(params, feed, None, signal_tx);
    engine.start().await.unwrap();

    assert!(engine.stop_symbol("ethusdt").await);
    assert_eq!(engine.active_symbols(), vec!["BTCUSDT".to_string()]);
    assert!(!engine.stop_symbol("ETHUSDT").await);

    engine.shutdown().await;
}

// ---------------------------------------------------------------------------
// Deterministic coordinator-level scenario
// ---------------------------------------------------------------------------

fn m5_candle(step: i64, close: Decimal) -> Candle {
    Candle {
        symbol: "BTCUSDT".to_string(),
        timeframe: Timeframe::M5,
        open_time: Utc.timestamp_opt(1_700_000_000 + step * 300, 0).unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: dec!(20),
    }
}

fn trend_state(tf: Timeframe, direction: TrendDirection, strength: Decimal, step: i64) -> TrendState {
    TrendState {
        symbol: "BTCUSDT".to_string(),
        timeframe: tf,
        direction,
        strength,
        computed_at: Utc.timestamp_opt(1_700_000_000 + step * 300, 0).unwrap(),
    }
}

fn profile_with_node(price: Decimal) -> VolumeProfile {
    let node = VolumeNode {
        price,
        volume: dec!(500),
    };
    VolumeProfile {
        symbol: "BTCUSDT".to_string(),
        timeframe: Timeframe::M5,
        window_candles: 60,
        buckets: vec![node.clone()],
        point_of_control: node.clone(),
        high_volume_nodes: vec![node],
        low_volume_nodes: vec![],
    }
}

#[test]
fn three_of_four_timeframes_up_fires_exactly_one_buy_until_cooldown_expiry() {
    let mut coordinator = SymbolCoordinator::new(
        "BTCUSDT",
        Timeframe::M5,
        AggregatorParams {
            min_agreeing_timeframes: 2,
        },
        SignalParams {
            actionable_confidence: dec!(0.70),
            node_proximity_pct: dec!(0.01),
            cooldown_secs: 900,
            cooldown_candles: 3,
        },
    );

    // Three longer timeframes agree on up; M5 itself disagrees
    for tf in [Timeframe::M15, Timeframe::M30, Timeframe::H1] {
        let mut candle = m5_candle(0, dec!(42000));
        candle.timeframe = tf;
        let event = CandleCloseEvent {
            candle,
            trend: Some(trend_state(tf, TrendDirection::Up, dec!(0.9), 0)),
            profile: None,
        };
        assert!(coordinator.on_event(event).is_none());
    }

    // Price revisits the established high-volume node on successive closes
    let mut signals = vec![];
    for step in 1..=12 {
        let event = CandleCloseEvent {
            candle: m5_candle(step, dec!(42000)),
            trend: Some(trend_state(
                Timeframe::M5,
                TrendDirection::Down,
                dec!(0.2),
                step,
            )),
            profile: Some(profile_with_node(dec!(42000))),
        };
        if let Some(signal) = coordinator.on_event(event) {
            signals.push((step, signal));
        }
    }

    // Exactly one buy fires from the first confirmation, then the pattern
    // repeating inside the cooldown produces nothing until expiry
    assert!(signals.len() >= 2);
    let (first_step, first) = &signals[0];
    assert_eq!(first.kind, SignalKind::Buy);
    assert_eq!(*first_step, 2, "armed on step 1, confirmed on step 2");

    let (second_step, second) = &signals[1];
    assert_eq!(second.kind, SignalKind::Buy);
    let gap = second.emitted_at - first.emitted_at;
    assert!(
        gap >= ChronoDuration::seconds(900),
        "second buy only after cooldown, gap was {}s at step {}",
        gap.num_seconds(),
        second_step
    );
}

#[test]
fn out_of_order_candle_leaves_analytics_unchanged() {
    use voltrend::engine::TimeframeWorker;

    let mut worker = TimeframeWorker::new(
        "BTCUSDT",
        Timeframe::M1,
        ProfileParams {
            bucket_width: dec!(10),
            window_candles: 3,
            hvn_ratio: dec!(0.5),
            lvn_ratio: dec!(0.1),
        },
        TrendParams {
            fast_period: 2,
            slow_period: 3,
            rsi_period: 2,
            volume_sma_period: 2,
            volume_confirmation: dec!(1.0),
        },
    );

    let mut last_event = None;
    for minute in 0..8 {
        if let Some(event) = worker.on_tick(&tick(minute, dec!(100) + Decimal::from(minute))) {
            last_event = Some(event);
        }
    }
    let before = last_event.expect("warmed up");
    let before_profile = before.profile.as_ref().expect("profile ready");
    let before_trend = before.trend.as_ref().expect("trend ready");

    // A tick far in the past is rejected without producing an event
    assert!(worker.on_tick(&tick(1, dec!(50))).is_none());

    // The next in-order close continues from the untouched state
    let after = worker
        .on_tick(&tick(9, dec!(109)))
        .expect("in-order close after rejection");
    let after_profile = after.profile.as_ref().expect("profile still ready");
    assert_eq!(
        after_profile.window_candles, before_profile.window_candles,
        "window length unaffected by the rejected tick"
    );
    assert_eq!(after.trend.as_ref().unwrap().direction, before_trend.direction);
    assert!(after.candle.open_time > before.candle.open_time);
}
