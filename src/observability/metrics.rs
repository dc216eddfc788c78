//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relayed requests by method, status
//! - `relay_request_duration_seconds` (histogram): relay latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter when metrics are enabled.
///
/// A bad address or a failed install is logged and otherwise ignored; the
/// relay serves traffic with or without an exporter.
pub fn init(address: &str) {
    let address: SocketAddr = match address.parse() {
        Ok(address) => address,
        Err(err) => {
            tracing::error!(metrics_address = address, error = %err, "invalid metrics address");
            return;
        }
    };

    match PrometheusBuilder::new().with_http_listener(address).install() {
        Ok(()) => tracing::info!(address = %address, "metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "failed to start metrics exporter"),
    }
}

/// Record one relayed request.
pub fn record_relay(method: &str, status: u16, started: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("relay_requests_total", &labels).increment(1);
    metrics::histogram!("relay_request_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());
}
