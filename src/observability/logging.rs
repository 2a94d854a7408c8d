//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (pretty or JSON output)
//! - Define the logger seam the middlewares report through
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)

use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Sink for telemetry log entries.
///
/// `meta` is the structured payload of the entry (a serialized sample or
/// statistics snapshot).
pub trait PerformanceLogger: Send + Sync {
    fn info(&self, message: &str, meta: &Value);
    fn warn(&self, message: &str, meta: &Value);
    fn error(&self, message: &str, meta: &Value);
}

/// Forwards entries to `tracing` under the `request_telemetry::perf` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl PerformanceLogger for TracingLogger {
    fn info(&self, message: &str, meta: &Value) {
        tracing::info!(target: "request_telemetry::perf", meta = %meta, "{}", message);
    }

    fn warn(&self, message: &str, meta: &Value) {
        tracing::warn!(target: "request_telemetry::perf", meta = %meta, "{}", message);
    }

    fn error(&self, message: &str, meta: &Value) {
        tracing::error!(target: "request_telemetry::perf", meta = %meta, "{}", message);
    }
}

/// Destination for the plain-text lines written when no logger is set.
pub trait ConsoleSink: Send + Sync {
    fn write_line(&self, line: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutConsole;

impl ConsoleSink for StdoutConsole {
    fn write_line(&self, line: &str) {
        println!("{line}");
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "request_telemetry={level},tower_http={level}",
            level = config.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
