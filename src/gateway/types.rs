//! Gateway types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Endpoint class, each with its own rate budget and circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
    /// Public market data endpoints (klines, tickers)
    MarketData,
    /// Authenticated account endpoints
    Account,
}

impl std::fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointClass::MarketData => f.write_str("market_data"),
            EndpointClass::Account => f.write_str("account"),
        }
    }
}

/// Gateway call errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request timed out (transient)
    #[error("request timed out")]
    Timeout,
    /// Upstream 5xx-equivalent response (transient)
    #[error("upstream error: HTTP {0}")]
    Upstream(u16),
    /// Upstream rejected the call for rate limiting (transient)
    #[error("rate limited by upstream")]
    RateLimited,
    /// Transport-level failure (transient)
    #[error("transport error: {0}")]
    Transport(String),
    /// Authentication or permission rejection (not retried)
    #[error("authentication rejected by upstream")]
    Auth,
    /// Request was malformed or rejected by validation (not retried)
    #[error("invalid request: {0}")]
    Validation(String),
    /// Circuit is open for the endpoint class; upstream was not contacted
    #[error("circuit open for {class}, retry in {retry_after:?}")]
    CircuitOpen {
        class: EndpointClass,
        retry_after: std::time::Duration,
    },
    /// Bounded retries exhausted; holds the final transient error
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Whether the gateway should retry this failure
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Timeout
                | GatewayError::Upstream(_)
                | GatewayError::RateLimited
                | GatewayError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// Rate budget for one endpoint class
#[derive(Debug, Clone)]
pub struct BudgetParams {
    /// Maximum tokens (burst size)
    pub capacity: f64,
    /// Tokens restored per second
    pub refill_per_sec: f64,
}

impl Default for BudgetParams {
    fn default() -> Self {
        Self {
            capacity: 10.0,
            refill_per_sec: 2.0,
        }
    }
}

/// Gateway retry and circuit parameters
#[derive(Debug, Clone)]
pub struct GatewayParams {
    /// Rate budget for market data endpoints
    pub market_data: BudgetParams,
    /// Rate budget for account endpoints
    pub account: BudgetParams,
    /// Maximum attempts per call, including the first
    pub max_attempts: u32,
    /// First retry delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Retry delay ceiling in milliseconds
    pub max_backoff_ms: u64,
    /// Consecutive transient failures that open the circuit
    pub breaker_failure_threshold: u32,
    /// Seconds the circuit stays open before admitting calls again
    pub breaker_cooldown_secs: u64,
}

impl Default for GatewayParams {
    fn default() -> Self {
        Self {
            market_data: BudgetParams::default(),
            account: BudgetParams {
                capacity: 5.0,
                refill_per_sec: 1.0,
            },
            max_attempts: 5,
            initial_backoff_ms: 250,
            max_backoff_ms: 10_000,
            breaker_failure_threshold: 5,
            breaker_cooldown_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Timeout.is_transient());
        assert!(GatewayError::Upstream(503).is_transient());
        assert!(GatewayError::RateLimited.is_transient());
        assert!(GatewayError::Transport("reset".into()).is_transient());

        assert!(!GatewayError::Auth.is_transient());
        assert!(!GatewayError::Validation("bad symbol".into()).is_transient());
        assert!(!GatewayError::CircuitOpen {
            class: EndpointClass::MarketData,
            retry_after: std::time::Duration::from_secs(1),
        }
        .is_transient());
    }

    #[test]
    fn test_endpoint_class_display() {
        assert_eq!(EndpointClass::MarketData.to_string(), "market_data");
        assert_eq!(EndpointClass::Account.to_string(), "account");
    }
}
