//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (resolutions, latency, cache builds, HTTP status)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `router_resolutions_total` (counter): resolutions by strategy, outcome
//! - `router_resolution_duration_seconds` (histogram): resolution latency
//! - `router_cache_builds_total` (counter): site/rule cache constructions
//! - `router_http_requests_total` (counter): HTTP responses by method, status
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - Labels are low-cardinality: strategy names, outcomes, status codes

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::RoutingResult;
use crate::routing::route::RouteOutcome;

/// Install the Prometheus recorder with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one pass through the resolution pipeline.
pub fn record_resolution(result: &RoutingResult<RouteOutcome>, start: Instant) {
    let (strategy, outcome) = match result {
        Ok(RouteOutcome::Matched { strategy, .. }) => (strategy.as_str(), "matched"),
        Ok(RouteOutcome::NotFound) => ("none", "not_found"),
        Err(_) => ("none", "error"),
    };

    metrics::counter!("router_resolutions_total", "strategy" => strategy, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("router_resolution_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_build() {
    metrics::counter!("router_cache_builds_total").increment(1);
}

pub fn record_http_request(method: &str, status: u16) {
    metrics::counter!(
        "router_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
