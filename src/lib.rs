//! voltrend: volume-profile and multi-timeframe trend signal engine
//!
//! This library provides the core components for:
//! - Live futures market data normalization (Binance aggTrade streams)
//! - Streaming volume profiles with sliding-window eviction
//! - Per-timeframe trend detection and multi-timeframe fusion
//! - A debounced per-symbol signal state machine
//! - Rate-limited, retrying, circuit-breaking exchange API access
//! - Pluggable notification sinks
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod engine;
pub mod feed;
pub mod gateway;
pub mod notify;
pub mod profile;
pub mod signal;
pub mod telemetry;
pub mod trend;
pub mod ws;
