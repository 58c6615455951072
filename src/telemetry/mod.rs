//! Telemetry module
//!
//! Structured logging and Prometheus metrics

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{
    install_prometheus, record_circuit_open, record_gateway_retry, record_ingest_rejected,
    record_notification_failure, record_signal_emitted,
};

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_json)?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
        tracing::info!(port, "prometheus exporter listening");
    }

    Ok(())
}
