//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_circuit_transitions_total` (counter): by circuit, new state
//! - `gateway_retry_attempts_total` (counter): failed attempts seen by
//!   the retry policy
//! - `gateway_payments_total` (counter): generated documents by method
//! - `gateway_payment_records` (gauge): records currently in the store

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_circuit_transition(circuit: &str, state: &'static str) {
    counter!(
        "gateway_circuit_transitions_total",
        "circuit" => circuit.to_string(),
        "state" => state
    )
    .increment(1);
}

pub fn record_retry_attempt() {
    counter!("gateway_retry_attempts_total").increment(1);
}

pub fn record_payment(method: &'static str) {
    counter!("gateway_payments_total", "method" => method).increment(1);
}

pub fn record_store_size(size: usize) {
    gauge!("gateway_payment_records").set(size as f64);
}
