//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_submissions_total` (counter): write submissions by outcome
//! - `gateway_submission_duration_seconds` (histogram): encode → receipt latency
//! - `gateway_audit_writes_total` (counter): audit writes by outcome
//! - `gateway_probe_health` (gauge): 1=healthy, 0=unhealthy, per probe
//! - `gateway_reconciler_backfills_total` (counter): records written by the reconciler
//! - `gateway_reconciler_pending` (gauge): outcomes still waiting for an audit record
//!
//! Updates go through the `metrics` facade and are no-ops until a recorder
//! is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_submission(outcome: &'static str, started: Instant) {
    counter!("gateway_submissions_total", "outcome" => outcome).increment(1);
    histogram!("gateway_submission_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_audit_write(outcome: &'static str) {
    counter!("gateway_audit_writes_total", "outcome" => outcome).increment(1);
}

pub fn record_probe_health(probe: &'static str, healthy: bool) {
    gauge!("gateway_probe_health", "probe" => probe).set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_backfill() {
    counter!("gateway_reconciler_backfills_total").increment(1);
}

pub fn record_reconciler_pending(pending: usize) {
    gauge!("gateway_reconciler_pending").set(pending as f64);
}
