//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, source
//! - `proxy_request_duration_seconds` (histogram): latency by method, status, source
//! - `proxy_cache_writes_total` (counter): cache write outcomes as seen by callers
//! - `proxy_cache_physical_writes_total` (counter): files actually written
//! - `proxy_access_log_dropped_total` (counter): access records lost to a full queue
//!
//! Sources are `cache`, `origin`, `static`, `api` and `rejected`.
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, source: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(
        "proxy_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "source" => source
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "status" => status,
        "source" => source
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_write(ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!("proxy_cache_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_physical_write() {
    counter!("proxy_cache_physical_writes_total").increment(1);
}

pub fn record_log_dropped() {
    counter!("proxy_access_log_dropped_total").increment(1);
}
