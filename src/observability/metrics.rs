//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): time to response headers
//! - `gateway_login_attempts_total` (counter): login interceptions by outcome
//! - `gateway_active_bridges` (gauge): open WebSocket bridges
//! - `gateway_forwarded_bytes_total` (counter): raw TCP bytes by direction
//! - `gateway_forwarded_connections_total` (counter): raw TCP pairs by outcome
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, route: &'static str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("route", route.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_login(outcome: &'static str) {
    counter!("gateway_login_attempts_total", "outcome" => outcome).increment(1);
}

pub fn bridge_opened() {
    gauge!("gateway_active_bridges").increment(1.0);
}

pub fn bridge_closed() {
    gauge!("gateway_active_bridges").decrement(1.0);
}

pub fn record_forwarded_bytes(direction: &'static str, bytes: u64) {
    counter!("gateway_forwarded_bytes_total", "direction" => direction).increment(bytes);
}

pub fn record_forwarded_connection(outcome: &'static str) {
    counter!("gateway_forwarded_connections_total", "outcome" => outcome).increment(1);
}
