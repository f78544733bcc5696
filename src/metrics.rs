// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for ha-monitor.
//!
//! This module provides metrics collection with the namespace prefix `ha_monitor_`.
//! A run is a short-lived process, so metrics are rendered once at the end of a
//! run (see [`gather_metrics`]) and written to a file for a textfile collector.
//!
//! # Metrics Categories
//!
//! - **Health Metrics** - Probe outcomes and healthy server counts
//! - **Reconciliation Metrics** - DNS reconciliation outcomes and mutations
//! - **Error Metrics** - Error conditions by category
//! - **Performance Metrics** - Run duration
//!
//! # Example
//!
//! ```rust,no_run
//! use ha_monitor::metrics::{gather_metrics, record_probe};
//!
//! record_probe("app", true);
//! let text = gather_metrics().unwrap();
//! assert!(text.contains("ha_monitor_probes_total"));
//! ```

use crate::model::{MutationAction, ReconciliationStatus};
use prometheus::{
    CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "ha_monitor";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Health Metrics
// ============================================================================

/// Total number of probes by service and result
///
/// Labels:
/// - `service`: Service name
/// - `result`: `healthy` or `unhealthy`
pub static PROBES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_probes_total"),
        "Total number of server health probes by service and result",
    );
    let counter = CounterVec::new(opts, &["service", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Number of healthy servers per service in the last run
///
/// Labels:
/// - `service`: Service name
pub static HEALTHY_SERVERS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_healthy_servers"),
        "Number of healthy servers per service",
    );
    let gauge = GaugeVec::new(opts, &["service"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of DNS reconciliations by outcome
///
/// Labels:
/// - `service`: Service name
/// - `status`: `ok`, `mismatch`, `updated`, `disabled`, or `error`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of DNS reconciliations by service and status",
    );
    let counter = CounterVec::new(opts, &["service", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of provider record mutations
///
/// Labels:
/// - `action`: `create` or `delete`
/// - `result`: `success` or `error`
pub static DNS_MUTATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_dns_mutations_total"),
        "Total number of DNS record mutations by action and result",
    );
    let counter = CounterVec::new(opts, &["action", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of errors by category
///
/// Labels:
/// - `error_type`: `config`, `credential`, `provider_fetch`, `provider_mutation`, `log_store`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Total number of errors by category",
    );
    let counter = CounterVec::new(opts, &["error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Performance Metrics
// ============================================================================

/// Duration of a full run in seconds
pub static RUN_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_run_duration_seconds"),
        "Duration of a full probe and reconcile run in seconds",
    )
    .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record one probe outcome
pub fn record_probe(service: &str, healthy: bool) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    PROBES_TOTAL.with_label_values(&[service, result]).inc();
}

/// Record the healthy server count of a service
#[allow(clippy::cast_precision_loss)]
pub fn set_healthy_servers(service: &str, count: usize) {
    HEALTHY_SERVERS.with_label_values(&[service]).set(count as f64);
}

/// Record a completed reconciliation
pub fn record_reconciliation(service: &str, status: ReconciliationStatus) {
    RECONCILIATION_TOTAL
        .with_label_values(&[service, status.as_str()])
        .inc();
}

/// Record a reconciliation that stopped on an error
pub fn record_reconciliation_error(service: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[service, "error"])
        .inc();
}

/// Record one provider mutation
pub fn record_mutation(action: MutationAction, success: bool) {
    let result = if success { "success" } else { "error" };
    DNS_MUTATIONS_TOTAL
        .with_label_values(&[action.as_str(), result])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `error_type` - Category of error (e.g., `config`, `provider_fetch`)
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Record the duration of a run
pub fn record_run_duration(duration: Duration) {
    RUN_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
