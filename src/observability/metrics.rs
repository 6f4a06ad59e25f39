//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy metrics (throughput, latency, probe outcomes)
//! - Expose a Prometheus-compatible scrape endpoint
//! - Track per-backend and aggregate metrics
//!
//! # Metrics
//! - `fnproxy_requests_total` (counter): proxied requests by method, status, backend
//! - `fnproxy_request_duration_seconds` (histogram): end-to-end latency
//! - `fnproxy_probes_total` (counter): health probe outcomes by backend
//! - `fnproxy_healthy_nodes` (gauge): size of the routable set
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations behind the macros)
//! - Backend address is a label; fleets are small enough that the
//!   cardinality stays manageable

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Failures are logged, not fatal;
/// the proxy keeps serving without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "failed to start metrics endpoint"),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, backend: &str, start_time: Instant) {
    counter!(
        "fnproxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!("fnproxy_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

/// Record one health probe outcome.
pub fn record_probe(backend: &str, success: bool) {
    counter!(
        "fnproxy_probes_total",
        "backend" => backend.to_string(),
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}

/// Publish the current routable-set size.
pub fn record_healthy_nodes(count: usize) {
    gauge!("fnproxy_healthy_nodes").set(count as f64);
}
