//! Prometheus metrics

use crate::feed::Timeframe;
use crate::gateway::EndpointClass;
use crate::signal::SignalKind;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Start the Prometheus scrape endpoint
pub fn install_prometheus(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install prometheus exporter: {}", e))
}

/// Count an emitted signal
pub fn record_signal_emitted(symbol: &str, kind: SignalKind) {
    counter!(
        "voltrend_signals_emitted_total",
        "symbol" => symbol.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Count a rejected out-of-order or duplicate update
pub fn record_ingest_rejected(symbol: &str, timeframe: Timeframe) {
    counter!(
        "voltrend_ingest_rejected_total",
        "symbol" => symbol.to_string(),
        "timeframe" => timeframe.to_string()
    )
    .increment(1);
}

/// Count a circuit-open transition
pub fn record_circuit_open(class: EndpointClass) {
    counter!(
        "voltrend_gateway_circuit_open_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Count a gateway retry after a transient failure
pub fn record_gateway_retry(class: EndpointClass) {
    counter!(
        "voltrend_gateway_retries_total",
        "class" => class.to_string()
    )
    .increment(1);
}

/// Count a failed notification delivery
pub fn record_notification_failure() {
    counter!("voltrend_notification_failures_total").increment(1);
}
