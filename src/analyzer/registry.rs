//! In-memory aggregate statistics.
//!
//! # Responsibilities
//! - One bucket per endpoint key, one per caller role, one overall
//! - Snapshot, explicit flush to a logger, reset
//!
//! # Design Decisions
//! - Explicitly constructed and shared via Arc; no process-global state
//! - One lock; every update is a short synchronous critical section
//! - Endpoint key count is capped; new keys past the cap fold into "OTHER"

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::observability::{metrics, ConsoleSink, PerformanceLogger, StdoutConsole};

/// Endpoint key that absorbs observations once the key cap is reached.
pub const OVERFLOW_ENDPOINT_KEY: &str = "OTHER";

/// Running summary for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateBucket {
    pub count: u64,
    pub total_duration_ms: u64,
    pub max_duration_ms: u64,
    /// `u64::MAX` until the first observation.
    pub min_duration_ms: u64,
    pub slow_count: u64,
}

impl AggregateBucket {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration_ms: 0,
            max_duration_ms: 0,
            min_duration_ms: u64::MAX,
            slow_count: 0,
        }
    }

    pub fn record(&mut self, duration_ms: u64, slow_threshold_ms: u64) {
        self.count += 1;
        self.total_duration_ms = self.total_duration_ms.saturating_add(duration_ms);
        self.max_duration_ms = self.max_duration_ms.max(duration_ms);
        self.min_duration_ms = self.min_duration_ms.min(duration_ms);
        if duration_ms > slow_threshold_ms {
            self.slow_count += 1;
        }
    }

    pub fn stats(&self) -> BucketStats {
        if self.count == 0 {
            return BucketStats::default();
        }
        BucketStats {
            count: self.count,
            total_duration_ms: self.total_duration_ms,
            mean_duration_ms: self.total_duration_ms as f64 / self.count as f64,
            min_duration_ms: self.min_duration_ms,
            max_duration_ms: self.max_duration_ms,
            slow_count: self.slow_count,
        }
    }
}

impl Default for AggregateBucket {
    fn default() -> Self {
        Self::new()
    }
}

/// Reportable view of a bucket. Never carries the min sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStats {
    pub count: u64,
    pub total_duration_ms: u64,
    pub mean_duration_ms: f64,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    pub slow_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub endpoints: BTreeMap<String, BucketStats>,
    pub roles: BTreeMap<String, BucketStats>,
    pub overall: BucketStats,
}

#[derive(Default)]
struct Inner {
    endpoints: HashMap<String, AggregateBucket>,
    roles: HashMap<String, AggregateBucket>,
    overall: AggregateBucket,
}

/// Process-lifetime aggregate statistics, owned by the composition root.
pub struct MetricsRegistry {
    inner: Mutex<Inner>,
    slow_threshold_ms: u64,
    max_endpoint_keys: usize,
}

impl MetricsRegistry {
    pub fn new(slow_threshold_ms: u64, max_endpoint_keys: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            slow_threshold_ms,
            max_endpoint_keys: max_endpoint_keys.max(1),
        }
    }

    /// Fold one duration into the endpoint, role, and overall buckets.
    /// Returns the overall count after the update.
    pub fn record(&self, endpoint: &str, role: &str, duration_ms: u64) -> u64 {
        let slow = self.slow_threshold_ms;
        let mut inner = self.inner.lock();

        let endpoint_key = if inner.endpoints.contains_key(endpoint)
            || inner.endpoints.len() < self.max_endpoint_keys
        {
            endpoint
        } else {
            OVERFLOW_ENDPOINT_KEY
        };
        inner
            .endpoints
            .entry(endpoint_key.to_owned())
            .or_default()
            .record(duration_ms, slow);
        inner
            .roles
            .entry(role.to_owned())
            .or_default()
            .record(duration_ms, slow);
        inner.overall.record(duration_ms, slow);

        metrics::record_endpoint_keys(inner.endpoints.len());
        inner.overall.count
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock();
        StatsSnapshot {
            endpoints: collect_stats(&inner.endpoints),
            roles: collect_stats(&inner.roles),
            overall: inner.overall.stats(),
        }
    }

    /// Write the current snapshot to `logger` at info level, or to stdout
    /// when no logger is given. Returns the snapshot that was written.
    pub fn flush(&self, logger: Option<&dyn PerformanceLogger>) -> StatsSnapshot {
        self.flush_to(logger, &StdoutConsole)
    }

    /// Like `flush`, with the no-logger line going to `console`.
    pub fn flush_to(
        &self,
        logger: Option<&dyn PerformanceLogger>,
        console: &dyn ConsoleSink,
    ) -> StatsSnapshot {
        let snapshot = self.snapshot();
        let meta = serde_json::to_value(&snapshot).unwrap_or(Value::Null);
        match logger {
            Some(logger) => logger.info("Performance statistics", &meta),
            None => console.write_line(&format!("Performance statistics: {meta}")),
        }
        snapshot
    }

    pub fn reset(&self) {
        *self.inner.lock() = Inner::default();
        metrics::record_endpoint_keys(0);
    }

    pub fn endpoint_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().endpoints.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn endpoint(&self, key: &str) -> Option<BucketStats> {
        self.inner.lock().endpoints.get(key).map(AggregateBucket::stats)
    }

    pub fn role(&self, key: &str) -> Option<BucketStats> {
        self.inner.lock().roles.get(key).map(AggregateBucket::stats)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().overall.count == 0
    }
}

fn collect_stats(buckets: &HashMap<String, AggregateBucket>) -> BTreeMap<String, BucketStats> {
    buckets
        .iter()
        .filter(|(_, b)| b.count > 0)
        .map(|(k, b)| (k.clone(), b.stats()))
        .collect()
}
