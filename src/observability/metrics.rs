//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, api
//! - `gateway_request_duration_seconds` (histogram): latency by method, api
//! - `gateway_upstream_attempts_total` (counter): attempts by target, outcome
//! - `gateway_response_bytes_total` (counter): body bytes written to clients

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished client request.
pub fn record_request(method: &str, status: u16, api: &str, started: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("api", api.to_string()),
    ];
    ::metrics::counter!("gateway_requests_total", &labels).increment(1);

    let labels = [("method", method.to_string()), ("api", api.to_string())];
    ::metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());
}

/// Record one upstream attempt. `outcome` is one of `reply`, `error`, `timeout`.
pub fn record_upstream_attempt(target: &str, outcome: &str, started: Instant) {
    let labels = [
        ("target", target.to_string()),
        ("outcome", outcome.to_string()),
    ];
    ::metrics::counter!("gateway_upstream_attempts_total", &labels).increment(1);
    tracing::trace!(
        upstream = %target,
        outcome,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Upstream attempt recorded"
    );
}

pub fn record_response_bytes(bytes: usize) {
    ::metrics::counter!("gateway_response_bytes_total").increment(bytes as u64);
}
