//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (lookups, cache efficiency, requests, latency)
//! - Expose a Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_lookups_total` (counter): lookups by outcome
//!   (`cache_hit`, `found`, `method_not_allowed`, `not_found`)
//! - `router_cache_total` (counter): cache lookups by result (`hit`, `miss`)
//! - `http_requests_total` (counter): served requests by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users
//!   and tests pay nothing
//! - Label values are static strings except method and status

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Count one route lookup.
pub fn record_lookup(outcome: &'static str) {
    counter!("router_lookups_total", "outcome" => outcome).increment(1);
}

/// Count one route cache lookup.
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("router_cache_total", "result" => result).increment(1);
}

/// Count a served request and its latency.
pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_owned();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}
