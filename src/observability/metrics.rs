//! Metrics collection.
//!
//! # Responsibilities
//! - Define client metrics (requests, latency, transport errors)
//! - Record through the `metrics` facade; the host installs the exporter
//!
//! # Metrics
//! - `unirest_requests_total` (counter): completed requests by method, status range
//! - `unirest_request_duration_seconds` (histogram): time to full response by method
//! - `unirest_transport_errors_total` (counter): failures by error code
//!
//! # Design Decisions
//! - Low-overhead metric updates; no-ops when no recorder is installed
//! - Labels stay low-cardinality (no URLs)

use std::time::Instant;

/// Record a request that produced a response.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let range = format!("{}xx", status / 100);
    metrics::counter!(
        "unirest_requests_total",
        "method" => method.to_string(),
        "status_range" => range
    )
    .increment(1);
    metrics::histogram!(
        "unirest_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a request that failed before producing a response.
pub fn record_transport_error(code: &'static str) {
    metrics::counter!("unirest_transport_errors_total", "code" => code).increment(1);
}
