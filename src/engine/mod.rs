//! Runtime engine
//!
//! Wires the feed, per-(symbol, timeframe) workers, per-symbol
//! coordinators and the notification queue together, with independent
//! cancellation per symbol.

mod coordinator;
mod worker;

pub use coordinator::SymbolCoordinator;
pub use worker::{CandleCloseEvent, TimeframeWorker};

use crate::feed::{FuturesRestClient, MarketFeed, Tick, Timeframe};
use crate::gateway::GatewayError;
use crate::profile::ProfileParams;
use crate::signal::{Signal, SignalParams};
use crate::trend::{AggregatorParams, TrendParams};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Assembled runtime parameters
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// Symbols to analyze
    pub symbols: Vec<String>,
    /// Timeframes per symbol
    pub timeframes: Vec<Timeframe>,
    /// Timeframe whose closes drive the signal state machine
    pub signal_timeframe: Timeframe,
    /// Volume profile parameters
    pub profile: ProfileParams,
    /// Trend detection parameters
    pub trend: TrendParams,
    /// Multi-timeframe aggregation parameters
    pub aggregator: AggregatorParams,
    /// Signal state machine parameters
    pub signal: SignalParams,
}

struct SymbolHandle {
    token: CancellationToken,
    tick_txs: Vec<mpsc::Sender<Tick>>,
    tasks: Vec<JoinHandle<()>>,
}

/// Top-level runtime
pub struct Engine {
    params: EngineParams,
    feed: Arc<dyn MarketFeed>,
    rest: Option<Arc<FuturesRestClient>>,
    signal_tx: mpsc::Sender<Signal>,
    root: CancellationToken,
    symbols: HashMap<String, SymbolHandle>,
    demux: Option<JoinHandle<()>>,
}

impl Engine {
    /// Create an engine; `rest` enables startup backfill when present
    pub fn new(
        params: EngineParams,
        feed: Arc<dyn MarketFeed>,
        rest: Option<Arc<FuturesRestClient>>,
        signal_tx: mpsc::Sender<Signal>,
    ) -> Self {
        let mut params = params;
        for symbol in &mut params.symbols {
            *symbol = symbol.to_uppercase();
        }
        Self {
            params,
            feed,
            rest,
            signal_tx,
            root: CancellationToken::new(),
            symbols: HashMap::new(),
            demux: None,
        }
    }

    /// Spawn all workers and begin routing ticks
    pub async fn start(&mut self) -> anyhow::Result<()> {
        let feed_rx = self.feed.subscribe().await?;

        for symbol in self.params.symbols.clone() {
            self.start_symbol(&symbol).await;
        }

        let routes: HashMap<String, Vec<mpsc::Sender<Tick>>> = self
            .symbols
            .iter()
            .map(|(symbol, handle)| (symbol.clone(), handle.tick_txs.clone()))
            .collect();
        self.demux = Some(Self::spawn_demux(feed_rx, routes, self.root.child_token()));

        tracing::info!(
            symbols = self.symbols.len(),
            timeframes = self.params.timeframes.len(),
            "engine started"
        );
        Ok(())
    }

    /// Spawn the worker set and coordinator for one symbol
    async fn start_symbol(&mut self, symbol: &str) {
        let token = self.root.child_token();
        let (event_tx, event_rx) = mpsc::channel::<CandleCloseEvent>(256);
        let mut tick_txs = Vec::new();
        let mut tasks = Vec::new();

        for &timeframe in &self.params.timeframes {
            let mut worker = TimeframeWorker::new(
                symbol,
                timeframe,
                self.params.profile.clone(),
                self.params.trend.clone(),
            );

            if let Some(rest) = &self.rest {
                Self::backfill_worker(rest, &mut worker, symbol, timeframe).await;
            }

            let (tick_tx, tick_rx) = mpsc::channel::<Tick>(1024);
            tick_txs.push(tick_tx);
            tasks.push(tokio::spawn(worker.run(
                tick_rx,
                event_tx.clone(),
                token.clone(),
            )));
        }
        drop(event_tx);

        let coordinator = SymbolCoordinator::new(
            symbol,
            self.params.signal_timeframe,
            self.params.aggregator.clone(),
            self.params.signal.clone(),
        );
        tasks.push(tokio::spawn(coordinator.run(
            event_rx,
            self.signal_tx.clone(),
            token.clone(),
        )));

        self.symbols.insert(
            symbol.to_string(),
            SymbolHandle {
                token,
                tick_txs,
                tasks,
            },
        );
        tracing::info!(symbol, "symbol workers started");
    }

    /// Warm one worker from REST history; circuit-open degrades to a warning
    async fn backfill_worker(
        rest: &Arc<FuturesRestClient>,
        worker: &mut TimeframeWorker,
        symbol: &str,
        timeframe: Timeframe,
    ) {
        let limit = worker.backfill_target().min(1000) as u32;
        match rest.fetch_klines(symbol, timeframe, limit).await {
            Ok(candles) => {
                worker.backfill(&candles);
            }
            Err(GatewayError::CircuitOpen { class, .. }) => {
                tracing::warn!(symbol, %timeframe, %class, "backfill skipped, circuit open");
            }
            Err(e) => {
                tracing::warn!(symbol, %timeframe, error = %e, "backfill failed, warming from live data");
            }
        }
    }

    fn spawn_demux(
        mut feed_rx: mpsc::Receiver<Tick>,
        routes: HashMap<String, Vec<mpsc::Sender<Tick>>>,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    tick = feed_rx.recv() => match tick {
                        Some(tick) => {
                            if let Some(txs) = routes.get(&tick.symbol) {
                                for tx in txs {
                                    // A closed channel means the symbol is
                                    // being stopped; nothing to do
                                    let _ = tx.send(tick.clone()).await;
                                }
                            }
                        }
                        None => {
                            tracing::warn!("feed stream ended");
                            break;
                        }
                    },
                }
            }
            tracing::debug!("demux stopped");
        })
    }

    /// Stop one symbol's workers without touching others
    pub async fn stop_symbol(&mut self, symbol: &str) -> bool {
        let Some(handle) = self.symbols.remove(&symbol.to_uppercase()) else {
            return false;
        };
        handle.token.cancel();
        for task in handle.tasks {
            let _ = task.await;
        }
        tracing::info!(symbol, "symbol workers stopped");
        true
    }

    /// Symbols currently running
    pub fn active_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.symbols.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Cancel everything and wait for tasks to finish
    pub async fn shutdown(&mut self) {
        self.root.cancel();
        for (_, handle) in self.symbols.drain() {
            for task in handle.tasks {
                let _ = task.await;
            }
        }
        if let Some(demux) = self.demux.take() {
            let _ = demux.await;
        }
        tracing::info!("engine stopped");
    }
}
