//! Gateway call path

use super::breaker::CircuitBreaker;
use super::bucket::TokenBucket;
use super::types::{EndpointClass, GatewayError, GatewayParams};
use crate::telemetry;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

struct ClassState {
    bucket: TokenBucket,
    breaker: CircuitBreaker,
}

/// Rate-limited, retrying, circuit-breaking call wrapper
///
/// All mutable budget state for an endpoint class lives behind one async
/// mutex, so concurrent callers cannot lose refills or double-spend tokens.
pub struct ApiGateway {
    params: GatewayParams,
    market_data: Mutex<ClassState>,
    account: Mutex<ClassState>,
}

impl ApiGateway {
    /// Create a gateway with full buckets and closed circuits
    pub fn new(params: GatewayParams) -> Self {
        let now = Instant::now();
        let class_state = |budget: &super::types::BudgetParams| ClassState {
            bucket: TokenBucket::new(budget, now),
            breaker: CircuitBreaker::new(
                params.breaker_failure_threshold,
                Duration::from_secs(params.breaker_cooldown_secs),
            ),
        };
        Self {
            market_data: Mutex::new(class_state(&params.market_data)),
            account: Mutex::new(class_state(&params.account)),
            params,
        }
    }

    /// Run `op` under the class's rate budget with bounded retries
    ///
    /// Suspends until a token is available. Transient failures are retried
    /// with exponential backoff and jitter; non-transient failures surface
    /// immediately. While the class circuit is open the call fails fast
    /// without contacting upstream.
    pub async fn call<T, F, Fut>(
        &self,
        class: EndpointClass,
        op: F,
    ) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.acquire(class).await?;

            match op().await {
                Ok(value) => {
                    self.state(class).lock().await.breaker.record_success();
                    return Ok(value);
                }
                Err(err) if err.is_transient() => {
                    let opened = self
                        .state(class)
                        .lock()
                        .await
                        .breaker
                        .record_failure(Instant::now());
                    if opened {
                        tracing::warn!(%class, error = %err, "circuit opened");
                        telemetry::record_circuit_open(class);
                    }

                    if attempt >= self.params.max_attempts {
                        return Err(GatewayError::Exhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }

                    let delay = self.backoff_delay(attempt);
                    tracing::debug!(%class, attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after transient failure");
                    telemetry::record_gateway_retry(class);
                    sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Whether the class circuit currently rejects calls
    pub async fn is_circuit_open(&self, class: EndpointClass) -> bool {
        self.state(class).lock().await.breaker.is_open(Instant::now())
    }

    /// Tokens currently available for the class
    pub async fn available_tokens(&self, class: EndpointClass) -> f64 {
        let mut state = self.state(class).lock().await;
        state.bucket.refill(Instant::now());
        state.bucket.available()
    }

    /// Wait for a token, failing fast while the circuit is open
    async fn acquire(&self, class: EndpointClass) -> Result<(), GatewayError> {
        loop {
            let wait = {
                let mut state = self.state(class).lock().await;
                let now = Instant::now();
                if let Some(retry_after) = state.breaker.retry_after(now) {
                    return Err(GatewayError::CircuitOpen { class, retry_after });
                }
                state.bucket.refill(now);
                if state.bucket.try_take() {
                    None
                } else {
                    Some(state.bucket.time_until_token())
                }
            };
            match wait {
                None => return Ok(()),
                Some(d) => sleep(d).await,
            }
        }
    }

    fn state(&self, class: EndpointClass) -> &Mutex<ClassState> {
        match class {
            EndpointClass::MarketData => &self.market_data,
            EndpointClass::Account => &self.account,
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let base = self
            .params
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.params.max_backoff_ms);
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        Duration::from_millis((base as f64 * jitter) as u64)
    }
}
