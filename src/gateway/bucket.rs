//! Token bucket

use super::types::BudgetParams;
use std::time::Duration;
use tokio::time::Instant;

/// Token bucket for one endpoint class
///
/// Callers pass the current instant explicitly so refill arithmetic is
/// deterministic under a paused test clock.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    pub fn new(params: &BudgetParams, now: Instant) -> Self {
        Self {
            capacity: params.capacity,
            refill_per_sec: params.refill_per_sec,
            tokens: params.capacity,
            last_refill: now,
        }
    }

    /// Credit tokens for the time elapsed since the last refill
    pub fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec)
            .min(self.capacity);
        self.last_refill = now;
    }

    /// Consume one token if available
    pub fn try_take(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until the next token accrues
    pub fn time_until_token(&self) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }
        let missing = 1.0 - self.tokens;
        Duration::from_secs_f64(missing / self.refill_per_sec)
    }

    /// Currently available tokens
    pub fn available(&self) -> f64 {
        self.tokens
    }
}
