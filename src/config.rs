//! Configuration types for voltrend
//!
//! Every option is explicit; validation runs at startup and fails fast
//! before any worker spawns.

use crate::engine::EngineParams;
use crate::feed::Timeframe;
use crate::gateway::{BudgetParams, GatewayParams};
use crate::profile::ProfileParams;
use crate::signal::SignalParams;
use crate::trend::{AggregatorParams, TrendParams};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

/// Configuration loading and validation errors; fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    pub profile: ProfileConfig,
    #[serde(default)]
    pub trend: TrendConfig,
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    pub signal: SignalConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    pub telemetry: TelemetryConfig,
}

/// Market feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub exchange: String,
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    pub signal_timeframe: Timeframe,
    /// Warm analytic windows from REST history at startup
    #[serde(default = "default_true")]
    pub backfill: bool,
}

/// Volume profile configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    pub bucket_width: Decimal,
    pub window_candles: usize,
    #[serde(default = "default_hvn_ratio")]
    pub hvn_ratio: Decimal,
    #[serde(default = "default_lvn_ratio")]
    pub lvn_ratio: Decimal,
}

/// Trend detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrendConfig {
    #[serde(default = "default_fast_period")]
    pub fast_period: usize,
    #[serde(default = "default_slow_period")]
    pub slow_period: usize,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_volume_sma_period")]
    pub volume_sma_period: usize,
    #[serde(default = "default_volume_confirmation")]
    pub volume_confirmation: Decimal,
}

/// Multi-timeframe aggregation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_min_agreeing")]
    pub min_agreeing_timeframes: usize,
}

/// Signal engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_actionable_confidence")]
    pub actionable_confidence: Decimal,
    #[serde(default = "default_node_proximity")]
    pub node_proximity_pct: Decimal,
    pub cooldown_secs: u64,
    pub cooldown_candles: u32,
}

/// Rate budget for one endpoint class
#[derive(Debug, Clone, Deserialize)]
pub struct BudgetConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

/// API gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_market_data_budget")]
    pub market_data: BudgetConfig,
    #[serde(default = "default_account_budget")]
    pub account: BudgetConfig,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_breaker_threshold")]
    pub breaker_failure_threshold: u32,
    #[serde(default = "default_breaker_cooldown_secs")]
    pub breaker_cooldown_secs: u64,
}

/// Notification sink selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyMode {
    #[default]
    Log,
    Telegram,
}

/// Notification configuration
///
/// The Telegram bot token is resolved by the CLI from the environment and
/// is never part of the config file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotifyConfig {
    #[serde(default)]
    pub mode: NotifyMode,
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_true() -> bool {
    true
}
fn default_hvn_ratio() -> Decimal {
    dec!(0.70)
}
fn default_lvn_ratio() -> Decimal {
    dec!(0.20)
}
fn default_fast_period() -> usize {
    20
}
fn default_slow_period() -> usize {
    50
}
fn default_rsi_period() -> usize {
    14
}
fn default_volume_sma_period() -> usize {
    20
}
fn default_volume_confirmation() -> Decimal {
    dec!(1.15)
}
fn default_min_agreeing() -> usize {
    2
}
fn default_actionable_confidence() -> Decimal {
    dec!(0.70)
}
fn default_node_proximity() -> Decimal {
    dec!(0.005)
}
fn default_market_data_budget() -> BudgetConfig {
    BudgetConfig {
        capacity: 10.0,
        refill_per_sec: 2.0,
    }
}
fn default_account_budget() -> BudgetConfig {
    BudgetConfig {
        capacity: 5.0,
        refill_per_sec: 1.0,
    }
}
fn default_max_attempts() -> u32 {
    5
}
fn default_initial_backoff_ms() -> u64 {
    250
}
fn default_max_backoff_ms() -> u64 {
    10_000
}
fn default_breaker_threshold() -> u32 {
    5
}
fn default_breaker_cooldown_secs() -> u64 {
    30
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            fast_period: default_fast_period(),
            slow_period: default_slow_period(),
            rsi_period: default_rsi_period(),
            volume_sma_period: default_volume_sma_period(),
            volume_confirmation: default_volume_confirmation(),
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_agreeing_timeframes: default_min_agreeing(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            market_data: default_market_data_budget(),
            account: default_account_budget(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            breaker_failure_threshold: default_breaker_threshold(),
            breaker_cooldown_secs: default_breaker_cooldown_secs(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option; any failure here is fatal at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.feed.symbols.is_empty() {
            return invalid("feed.symbols must not be empty".into());
        }
        if self.feed.timeframes.is_empty() {
            return invalid("feed.timeframes must not be empty".into());
        }
        let mut seen = std::collections::BTreeSet::new();
        for tf in &self.feed.timeframes {
            if !seen.insert(tf) {
                return invalid(format!("feed.timeframes lists {} twice", tf));
            }
        }
        if !self.feed.timeframes.contains(&self.feed.signal_timeframe) {
            return invalid(format!(
                "feed.signal_timeframe {} is not in feed.timeframes",
                self.feed.signal_timeframe
            ));
        }

        if self.profile.bucket_width <= Decimal::ZERO {
            return invalid("profile.bucket_width must be positive".into());
        }
        if self.profile.window_candles == 0 {
            return invalid("profile.window_candles must be positive".into());
        }
        if self.profile.lvn_ratio <= Decimal::ZERO
            || self.profile.hvn_ratio > Decimal::ONE
            || self.profile.lvn_ratio >= self.profile.hvn_ratio
        {
            return invalid("profile node ratios must satisfy 0 < lvn_ratio < hvn_ratio <= 1".into());
        }

        if self.trend.fast_period == 0 || self.trend.rsi_period == 0 || self.trend.volume_sma_period == 0
        {
            return invalid("trend periods must be positive".into());
        }
        if self.trend.fast_period >= self.trend.slow_period {
            return invalid("trend.fast_period must be less than trend.slow_period".into());
        }
        if self.trend.volume_confirmation <= Decimal::ZERO {
            return invalid("trend.volume_confirmation must be positive".into());
        }

        if self.aggregator.min_agreeing_timeframes == 0
            || self.aggregator.min_agreeing_timeframes > self.feed.timeframes.len()
        {
            return invalid(format!(
                "aggregator.min_agreeing_timeframes must be in 1..={}",
                self.feed.timeframes.len()
            ));
        }

        if self.signal.actionable_confidence <= Decimal::ZERO
            || self.signal.actionable_confidence > Decimal::ONE
        {
            return invalid("signal.actionable_confidence must be in (0, 1]".into());
        }
        if self.signal.node_proximity_pct <= Decimal::ZERO {
            return invalid("signal.node_proximity_pct must be positive".into());
        }
        if self.signal.cooldown_secs == 0 || self.signal.cooldown_candles == 0 {
            return invalid("signal cooldown durations must be positive".into());
        }

        for (name, budget) in [
            ("market_data", &self.gateway.market_data),
            ("account", &self.gateway.account),
        ] {
            if budget.capacity < 1.0 || budget.refill_per_sec <= 0.0 {
                return invalid(format!(
                    "gateway.{} budget needs capacity >= 1 and positive refill",
                    name
                ));
            }
        }
        if self.gateway.max_attempts == 0 {
            return invalid("gateway.max_attempts must be at least 1".into());
        }
        if self.gateway.initial_backoff_ms > self.gateway.max_backoff_ms {
            return invalid("gateway.initial_backoff_ms exceeds gateway.max_backoff_ms".into());
        }

        if self.notify.mode == NotifyMode::Telegram && self.notify.telegram_chat_id.is_none() {
            return invalid("notify.telegram_chat_id is required for telegram mode".into());
        }

        Ok(())
    }

    /// Assemble runtime engine parameters
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            symbols: self.feed.symbols.clone(),
            timeframes: self.feed.timeframes.clone(),
            signal_timeframe: self.feed.signal_timeframe,
            profile: ProfileParams {
                bucket_width: self.profile.bucket_width,
                window_candles: self.profile.window_candles,
                hvn_ratio: self.profile.hvn_ratio,
                lvn_ratio: self.profile.lvn_ratio,
            },
            trend: TrendParams {
                fast_period: self.trend.fast_period,
                slow_period: self.trend.slow_period,
                rsi_period: self.trend.rsi_period,
                volume_sma_period: self.trend.volume_sma_period,
                volume_confirmation: self.trend.volume_confirmation,
            },
            aggregator: AggregatorParams {
                min_agreeing_timeframes: self.aggregator.min_agreeing_timeframes,
            },
            signal: SignalParams {
                actionable_confidence: self.signal.actionable_confidence,
                node_proximity_pct: self.signal.node_proximity_pct,
                cooldown_secs: self.signal.cooldown_secs,
                cooldown_candles: self.signal.cooldown_candles,
            },
        }
    }

    /// Assemble gateway parameters
    pub fn gateway_params(&self) -> GatewayParams {
        GatewayParams {
            market_data: BudgetParams {
                capacity: self.gateway.market_data.capacity,
                refill_per_sec: self.gateway.market_data.refill_per_sec,
            },
            account: BudgetParams {
                capacity: self.gateway.account.capacity,
                refill_per_sec: self.gateway.account.refill_per_sec,
            },
            max_attempts: self.gateway.max_attempts,
            initial_backoff_ms: self.gateway.initial_backoff_ms,
            max_backoff_ms: self.gateway.max_backoff_ms,
            breaker_failure_threshold: self.gateway.breaker_failure_threshold,
            breaker_cooldown_secs: self.gateway.breaker_cooldown_secs,
        }
    }
}
