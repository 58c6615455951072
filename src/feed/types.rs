//! Market data primitives

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single normalized trade tick from an exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    /// Trading symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Exchange trade timestamp
    pub timestamp: DateTime<Utc>,
    /// Trade price
    pub price: Decimal,
    /// Trade quantity
    pub volume: Decimal,
}

/// Candle timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
}

impl Timeframe {
    /// Exchange interval string (e.g., "5m")
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
        }
    }

    /// Window length in seconds
    pub fn duration_secs(&self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M3 => 180,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::M30 => 1800,
            Timeframe::H1 => 3600,
            Timeframe::H4 => 14400,
        }
    }

    /// Window length as a chrono duration
    pub fn duration(&self) -> Duration {
        Duration::seconds(self.duration_secs())
    }

    /// Floor a timestamp to the start of its window
    pub fn window_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.duration_secs();
        let floored = ts.timestamp().div_euclid(secs) * secs;
        DateTime::from_timestamp(floored, 0).expect("valid unix timestamp")
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.interval())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Timeframe::M1),
            "3m" => Ok(Timeframe::M3),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "30m" => Ok(Timeframe::M30),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            other => Err(format!("unknown timeframe: {}", other)),
        }
    }
}

/// OHLC + volume aggregate over one timeframe window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Trading symbol
    pub symbol: String,
    /// Timeframe this candle belongs to
    pub timeframe: Timeframe,
    /// Window start
    pub open_time: DateTime<Utc>,
    /// First trade price in the window
    pub open: Decimal,
    /// Highest trade price
    pub high: Decimal,
    /// Lowest trade price
    pub low: Decimal,
    /// Last trade price
    pub close: Decimal,
    /// Total traded volume
    pub volume: Decimal,
}

impl Candle {
    /// Open a new candle from the first tick of a window
    pub fn from_tick(tick: &Tick, timeframe: Timeframe) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            timeframe,
            open_time: timeframe.window_start(tick.timestamp),
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.volume,
        }
    }

    /// Fold another tick of the same window into this candle
    pub fn apply_tick(&mut self, tick: &Tick) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.close = tick.price;
        self.volume += tick.volume;
    }

    /// Window end (exclusive)
    pub fn close_time(&self) -> DateTime<Utc> {
        self.open_time + self.timeframe.duration()
    }
}
