//! Metrics facade recording.
//!
//! # Metrics
//! - `telemetry_requests_total` (counter): finalized samples by method, status, level
//! - `telemetry_request_duration_ms` (histogram): sample durations by method
//! - `telemetry_slow_requests_total` (counter): samples over the collector threshold, by method
//! - `telemetry_store_failures_total` (counter): failed detached store writes
//! - `telemetry_progress_emissions_total` (counter): progress ticks by channel
//! - `telemetry_analyzer_requests_total` (counter): sampling decisions
//! - `telemetry_endpoint_keys` (gauge): distinct endpoint buckets
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade only; no exporter is
//!   installed here, so without a recorder these calls are no-ops

use metrics::{counter, gauge, histogram};

use crate::collector::PerformanceLevel;

pub fn record_sample(method: &str, status: u16, level: PerformanceLevel, duration_ms: u64) {
    counter!(
        "telemetry_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "level" => level.as_str()
    )
    .increment(1);

    histogram!("telemetry_request_duration_ms", "method" => method.to_string())
        .record(duration_ms as f64);
}

/// Labelled by method only; routes are unbounded before the registry cap.
pub fn record_slow_request(method: &str) {
    counter!("telemetry_slow_requests_total", "method" => method.to_string()).increment(1);
}

pub fn record_store_failure() {
    counter!("telemetry_store_failures_total").increment(1);
}

pub fn record_progress_emission(channel: &'static str) {
    counter!("telemetry_progress_emissions_total", "channel" => channel).increment(1);
}

pub fn record_sampling_decision(sampled: bool) {
    let decision = if sampled { "sampled" } else { "skipped" };
    counter!("telemetry_analyzer_requests_total", "decision" => decision).increment(1);
}

pub fn record_endpoint_keys(count: usize) {
    gauge!("telemetry_endpoint_keys").set(count as f64);
}
