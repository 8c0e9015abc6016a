//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ledger_requests_total` (counter): requests by method, status
//! - `ledger_request_duration_seconds` (histogram): latency distribution
//! - `ledger_rate_limited_total` (counter): requests rejected with 429
//! - `ledger_sessions_total` (counter): token checks by outcome
//! - `ledger_lifecycle_failures_total` (counter): failed hooks by phase, component
//!
//! # Design Decisions
//! - The Prometheus exporter is optional; without it the macros record nothing
//! - Labels never carry request paths, so cardinality stays bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "ledger_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "ledger_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a request rejected by the rate limiter.
pub fn record_rate_limited() {
    counter!("ledger_rate_limited_total").increment(1);
}

/// Record the outcome of a session token check.
pub fn record_session(outcome: &'static str) {
    counter!("ledger_sessions_total", "outcome" => outcome).increment(1);
}

/// Record a failed lifecycle hook.
pub fn record_lifecycle_failure(phase: &str, component: &str) {
    counter!(
        "ledger_lifecycle_failures_total",
        "phase" => phase.to_string(),
        "component" => component.to_string()
    )
    .increment(1);
}
