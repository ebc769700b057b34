//! Self-metrics and Prometheus exposition.
//!
//! # Responsibilities
//! - Expose a Prometheus scrape endpoint for the service's own health
//! - Track export attempts, pending and dropped batches, callback failures
//! - Track cart operations by outcome
//!
//! # Metrics
//! - `telemetry_export_attempts_total` (counter): by outcome
//! - `telemetry_export_pending_batches` (gauge): batches waiting for retry
//! - `telemetry_export_dropped_batches_total` (counter): evicted from the retry queue
//! - `telemetry_callback_failures_total` (counter): by instrument
//! - `telemetry_spans_dropped_total` (counter): span queue overflow
//! - `cart_operations_total` (counter): by operation, outcome
//!
//! # Design Decisions
//! - Uses the `metrics` facade; without an installed recorder every call
//!   is a no-op, so tests need no setup
//! - These describe the pipeline itself, never the exported business data

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with an HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Record one export attempt. `outcome` is `success`, `failure` or `timeout`.
pub fn record_export(outcome: &'static str) {
    metrics::counter!("telemetry_export_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_pending_batches(count: usize) {
    metrics::gauge!("telemetry_export_pending_batches").set(count as f64);
}

pub fn record_dropped_batch() {
    metrics::counter!("telemetry_export_dropped_batches_total").increment(1);
}

pub fn record_callback_failure(instrument: &str) {
    metrics::counter!("telemetry_callback_failures_total", "instrument" => instrument.to_string())
        .increment(1);
}

pub fn record_span_dropped() {
    metrics::counter!("telemetry_spans_dropped_total").increment(1);
}

pub fn record_cart_operation(operation: &'static str, outcome: &'static str) {
    metrics::counter!("cart_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}
