//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! telemetry pipeline and the demo server that hosts it.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Listener and request limits for the demo server.
    pub server: ServerConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Request timer and memory profiler.
    pub collector: CollectorConfig,

    /// Progress streamer for slow mutating requests.
    pub tracker: TrackerConfig,

    /// Sampled per-endpoint / per-role aggregation.
    pub analyzer: AnalyzerConfig,

    /// Admin endpoints exposing the aggregate statistics.
    pub admin: AdminConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format: "pretty" or "json".
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Collector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub enabled: bool,

    /// Requests slower than this (ms) are logged at warn level.
    pub threshold_ms: u64,

    /// Log every request, not only the slow ones.
    pub log_all: bool,

    /// Capture process memory counters at entry and completion.
    pub memory_profiling: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_ms: 1000,
            log_all: false,
            memory_profiling: true,
        }
    }
}

/// Tracker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub enabled: bool,

    /// Tick interval in milliseconds.
    pub interval_ms: u64,

    /// No progress is emitted before this much time (ms) has elapsed.
    pub threshold_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 100,
            threshold_ms: 1000,
        }
    }
}

/// Analyzer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub enabled: bool,

    /// Probability in [0, 1] that a request is instrumented.
    pub sample_rate: f64,

    /// Log a full snapshot every N sampled requests (0 = never).
    pub flush_every: u64,

    /// Durations above this (ms) count towards a bucket's slow count.
    pub slow_threshold_ms: u64,

    /// Distinct endpoint keys kept before new keys fold into "OTHER".
    pub max_endpoint_keys: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 0.1,
            flush_every: 100,
            slow_threshold_ms: 1000,
            max_endpoint_keys: 1024,
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/_telemetry/*` routes.
    pub enabled: bool,

    /// Bearer token required by the admin routes. Open when unset.
    pub api_key: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
        }
    }
}
