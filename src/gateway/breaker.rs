//! Circuit breaker

use std::time::Duration;
use tokio::time::Instant;

/// Per-endpoint-class circuit breaker
///
/// Opens after a run of consecutive transient failures. While open, calls
/// are rejected without contacting upstream. Once the cooldown elapses,
/// calls are admitted again; the next failure re-opens the circuit
/// immediately, the next success closes it.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    /// Create a closed breaker
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    /// Remaining open time, if calls should be rejected right now
    pub fn retry_after(&self, now: Instant) -> Option<Duration> {
        let opened = self.opened_at?;
        let elapsed = now.saturating_duration_since(opened);
        if elapsed < self.cooldown {
            Some(self.cooldown - elapsed)
        } else {
            None
        }
    }

    /// Whether the circuit currently rejects calls
    pub fn is_open(&self, now: Instant) -> bool {
        self.retry_after(now).is_some()
    }

    /// Record a successful call
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.opened_at = None;
    }

    /// Record a transient failure; returns true if this transition opened
    /// the circuit
    pub fn record_failure(&mut self, now: Instant) -> bool {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.failure_threshold {
            let was_rejecting = self.is_open(now);
            self.opened_at = Some(now);
            return !was_rejecting;
        }
        false
    }
}
