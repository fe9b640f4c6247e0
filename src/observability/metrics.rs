//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, method, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_rate_limited_total` (counter): 429s by route
//! - `gateway_rate_limit_entries` (gauge): identifiers tracked by the limiter
//! - `gateway_upstream_requests_total` (counter): third-party calls by provider, outcome
//! - `gateway_honeypot_hits_total` (counter): bot-trap submissions
//!
//! Recording is a no-op until a recorder is installed, so tests need no setup.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited(route: &'static str) {
    counter!("gateway_rate_limited_total", "route" => route).increment(1);
}

pub fn record_rate_limit_entries(count: usize) {
    gauge!("gateway_rate_limit_entries").set(count as f64);
}

pub fn record_upstream(provider: &'static str, outcome: &'static str) {
    counter!(
        "gateway_upstream_requests_total",
        "provider" => provider,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_honeypot() {
    counter!("gateway_honeypot_hits_total").increment(1);
}
