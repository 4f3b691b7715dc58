//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_match_total` (counter): forward lookups by kind (static, dynamic, none)
//! - `router_generate_total` (counter): link builds by outcome
//! - `router_cache_total` (counter): table cache lookups by outcome (hit, store, build)
//! - `stream_cache_total` (counter): id stream reads by outcome (hit, refresh, miss, bypass)
//! - `http_requests_total` (counter): front controller responses by status
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_match(kind: &'static str) {
    metrics::counter!("router_match_total", "kind" => kind).increment(1);
}

pub fn record_generate(outcome: &'static str) {
    metrics::counter!("router_generate_total", "outcome" => outcome).increment(1);
}

pub fn record_router_cache(outcome: &'static str) {
    metrics::counter!("router_cache_total", "outcome" => outcome).increment(1);
}

pub fn record_stream_cache(outcome: &'static str) {
    metrics::counter!("stream_cache_total", "outcome" => outcome).increment(1);
}

pub fn record_request(status: u16) {
    metrics::counter!("http_requests_total", "status" => status.to_string()).increment(1);
}
