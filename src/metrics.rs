// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the certwatch operator.
//!
//! All metrics use the namespace prefix `certwatch_io_` (prometheus-safe version of
//! "certwatch.io"). Metrics are recorded into [`METRICS_REGISTRY`]; serving them is
//! left to the embedding process through [`gather_metrics`].
//!
//! # Metrics
//!
//! - `certwatch_io_reconciliations_total{outcome}` - reconciliations by outcome
//! - `certwatch_io_reconciliation_duration_seconds` - reconciliation latency
//! - `certwatch_io_status_conflicts_total` - status writes rejected as stale
//! - `certwatch_io_triggers_total{source}` - reconcile requests from `secret` and `scan`
//!
//! # Example
//!
//! ```rust,no_run
//! use certwatch::metrics::{record_reconciliation, OUTCOME_READY};
//!
//! record_reconciliation(OUTCOME_READY, std::time::Duration::from_millis(12));
//! ```

use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

/// Namespace prefix for all certwatch metrics (prometheus-safe)
const METRICS_NAMESPACE: &str = "certwatch_io";

pub const OUTCOME_READY: &str = "ready";
pub const OUTCOME_NOT_READY: &str = "not_ready";
pub const OUTCOME_UNKNOWN: &str = "unknown";
pub const OUTCOME_DELETED: &str = "deleted";
pub const OUTCOME_ERROR: &str = "error";

pub const SOURCE_SECRET: &str = "secret";
pub const SOURCE_SCAN: &str = "scan";

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total number of reconciliations by outcome
///
/// Labels:
/// - `outcome`: `ready`, `not_ready`, `unknown`, `deleted` or `error`
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of SSL reconciliations by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of reconciliations in seconds
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of SSL reconciliations in seconds",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

/// Total number of status writes rejected because the object changed
pub static STATUS_CONFLICTS_TOTAL: LazyLock<Counter> = LazyLock::new(|| {
    let counter = Counter::new(
        format!("{METRICS_NAMESPACE}_status_conflicts_total"),
        "Total number of SSL status writes rejected with a conflict",
    )
    .unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of synthetic reconcile requests by source
///
/// Labels:
/// - `source`: `secret` (mapped secret update) or `scan` (periodic expiry scan)
pub static TRIGGERS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_triggers_total"),
        "Total number of synthetic reconcile requests by source",
    );
    let counter = CounterVec::new(opts, &["source"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Record a finished reconciliation
///
/// # Arguments
/// * `outcome` - One of the `OUTCOME_*` labels
/// * `duration` - Duration of the reconciliation
pub fn record_reconciliation(outcome: &str, duration: Duration) {
    RECONCILIATION_TOTAL.with_label_values(&[outcome]).inc();
    RECONCILIATION_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a status write conflict
pub fn record_status_conflict() {
    STATUS_CONFLICTS_TOTAL.inc();
}

/// Record `count` reconcile requests emitted by `source`
#[allow(clippy::cast_precision_loss)]
pub fn record_triggers(source: &str, count: usize) {
    TRIGGERS_TOTAL
        .with_label_values(&[source])
        .inc_by(count as f64);
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
