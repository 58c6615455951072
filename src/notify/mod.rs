//! Notification module
//!
//! Delivers emitted signals to an external sink. Delivery is fire-and-forget
//! from the analytic path's point of view: failures are logged and counted,
//! never retried here.

mod telegram;

pub use telegram::TelegramSink;

use crate::signal::Signal;
use crate::telemetry;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Receives emitted signals for delivery
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one signal; the sink owns its own retry policy
    async fn deliver(&self, signal: &Signal) -> anyhow::Result<()>;
}

/// Sink that logs signals through tracing
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, signal: &Signal) -> anyhow::Result<()> {
        tracing::info!(
            symbol = %signal.symbol,
            kind = %signal.kind,
            confidence = %signal.confidence,
            price = %signal.price,
            "signal"
        );
        Ok(())
    }
}

/// Drain the signal queue into the sink
///
/// Runs until the sending side closes. A failed delivery is logged and
/// dropped so one slow sink cannot back up the analytic path.
pub fn spawn_dispatcher(
    mut rx: mpsc::Receiver<Signal>,
    sink: Arc<dyn NotificationSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(signal) = rx.recv().await {
            if let Err(e) = sink.deliver(&signal).await {
                tracing::warn!(
                    error = %e,
                    symbol = %signal.symbol,
                    id = %signal.id,
                    "Notification delivery failed"
                );
                telemetry::record_notification_failure();
            }
        }
        tracing::debug!("Notification dispatcher stopped");
    })
}
