//! Binance futures REST client
//!
//! Kline backfill for warming analytic windows at startup. Every request
//! goes through the API gateway's market-data budget.

use super::types::{Candle, Timeframe};
use crate::gateway::{ApiGateway, EndpointClass, GatewayError};
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Binance futures REST base URL
const BINANCE_FUTURES_API_URL: &str = "https://fapi.binance.com";

/// Raw kline row: open time, OHLCV strings, close time, quote volume,
/// trade count, taker volumes, unused trailing field
type RawKline = (
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    u64,
    String,
    String,
    String,
);

/// REST client for kline history
pub struct FuturesRestClient {
    http: Client,
    base_url: String,
    gateway: Arc<ApiGateway>,
}

impl FuturesRestClient {
    /// Create a client with the default base URL
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            base_url: BINANCE_FUTURES_API_URL.to_string(),
            gateway,
        }
    }

    /// Override the base URL (tests, alternative clusters)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch up to `limit` klines, oldest first, dropping the in-progress
    /// final window so only closed candles are returned
    pub async fn fetch_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, GatewayError> {
        let url = format!("{}/fapi/v1/klines", self.base_url);
        let symbol_upper = symbol.to_uppercase();

        let mut raw = self
            .gateway
            .call(EndpointClass::MarketData, || {
                let http = self.http.clone();
                let url = url.clone();
                let symbol_q = symbol_upper.clone();
                async move {
                    let response = http
                        .get(&url)
                        .query(&[
                            ("symbol", symbol_q.as_str()),
                            ("interval", timeframe.interval()),
                            ("limit", &limit.to_string()),
                        ])
                        .send()
                        .await?;

                    let status = response.status().as_u16();
                    if let Some(err) = Self::map_status(status) {
                        return Err(err);
                    }

                    response
                        .json::<Vec<RawKline>>()
                        .await
                        .map_err(|e| GatewayError::Transport(e.to_string()))
                }
            })
            .await?;

        raw.pop();

        let candles = raw
            .into_iter()
            .filter_map(|row| match Self::parse_kline(&symbol_upper, timeframe, row) {
                Some(candle) => Some(candle),
                None => {
                    tracing::warn!(symbol = %symbol_upper, %timeframe, "Skipping unparseable kline");
                    None
                }
            })
            .collect();
        Ok(candles)
    }

    /// Map an error HTTP status to a gateway error
    fn map_status(status: u16) -> Option<GatewayError> {
        match status {
            200..=299 => None,
            429 | 418 => Some(GatewayError::RateLimited),
            401 | 403 => Some(GatewayError::Auth),
            400..=499 => Some(GatewayError::Validation(format!("HTTP {}", status))),
            _ => Some(GatewayError::Upstream(status)),
        }
    }

    fn parse_kline(symbol: &str, timeframe: Timeframe, row: RawKline) -> Option<Candle> {
        let open_time = Utc.timestamp_millis_opt(row.0).single()?;
        Some(Candle {
            symbol: symbol.to_string(),
            timeframe,
            open_time,
            open: Decimal::from_str(&row.1).ok()?,
            high: Decimal::from_str(&row.2).ok()?,
            low: Decimal::from_str(&row.3).ok()?,
            close: Decimal::from_str(&row.4).ok()?,
            volume: Decimal::from_str(&row.5).ok()?,
        })
    }
}
