//! Rate-limited API gateway
//!
//! Wraps outbound exchange calls with per-endpoint-class token-bucket
//! throttling, bounded retries with exponential backoff and jitter, and a
//! circuit breaker that sheds load from a degraded upstream.

mod breaker;
mod bucket;
mod client;
mod types;

pub use client::ApiGateway;
pub use types::{BudgetParams, EndpointClass, GatewayError, GatewayParams};
