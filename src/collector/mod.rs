//! Request timer & memory profiler.
//!
//! # Data Flow
//! ```text
//! request entry
//!     → capture Instant, epoch ms, memory snapshot, request id, route, role
//!     → inner service produces the response head
//!     → X-Response-Time / X-Performance-Level set on the head
//!     → body wrapped in CompletionBody
//! finish event (body completed, errored, or dropped)
//!     → PerformanceSample built (duration, memory delta, slow flag)
//!     → logger (warn if slow, info if log_all) or console line
//!     → detached store write (optional)
//! ```
//!
//! # Design Decisions
//! - Headers always go on the response head, before anything is flushed
//! - The finish callback runs under `catch_unwind`; instrumentation never
//!   unwinds into the response path
//! - Store writes are fire-and-forget; a lost sample is acceptable

pub mod alloc;
pub mod memory;
pub mod sample;
pub mod store;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tokio::time::Instant;

use crate::config::CollectorConfig;
use crate::http::body::{CompletionBody, RequestOutcome};
use crate::http::context;
use crate::observability::{metrics, ConsoleSink, PerformanceLogger, StdoutConsole, TracingLogger};

pub use alloc::TrackingAllocator;
pub use memory::{MemoryDelta, MemoryProbe, MemoryUsage, NoopMemoryProbe, ProcessMemoryProbe};
pub use sample::{PerformanceLevel, PerformanceSample};
pub use store::{PerformanceStore, StoreError};

pub const X_RESPONSE_TIME: &str = "x-response-time";
pub const X_PERFORMANCE_LEVEL: &str = "x-performance-level";

/// Times and memory-profiles every request.
pub struct Collector {
    config: CollectorConfig,
    logger: Option<Arc<dyn PerformanceLogger>>,
    console: Arc<dyn ConsoleSink>,
    store: Option<Arc<dyn PerformanceStore>>,
    probe: Arc<dyn MemoryProbe>,
}

/// Entry-time state of a request still in flight.
struct PendingSample {
    request_id: String,
    started: Instant,
    started_at_ms: u64,
    method: String,
    route: String,
    start_memory: MemoryUsage,
}

impl Collector {
    /// Collector logging through `tracing`, with no store.
    pub fn new(config: CollectorConfig) -> Self {
        let probe: Arc<dyn MemoryProbe> = if config.memory_profiling {
            Arc::new(ProcessMemoryProbe::new())
        } else {
            Arc::new(NoopMemoryProbe)
        };
        Self {
            config,
            logger: Some(Arc::new(TracingLogger)),
            console: Arc::new(StdoutConsole),
            store: None,
            probe,
        }
    }

    /// Replace the logger. `None` falls back to plain console lines.
    pub fn with_logger(mut self, logger: Option<Arc<dyn PerformanceLogger>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PerformanceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    fn begin(&self, req: &Request) -> PendingSample {
        PendingSample {
            request_id: context::request_id(req.headers()),
            started: Instant::now(),
            started_at_ms: epoch_millis(),
            method: req.method().to_string(),
            route: context::route_of(req),
            start_memory: self.probe.snapshot(),
        }
    }

    fn complete(
        &self,
        pending: PendingSample,
        status: StatusCode,
        caller_role: String,
        outcome: RequestOutcome,
    ) {
        let duration_ms = pending.started.elapsed().as_millis() as u64;
        let memory_delta = self.probe.snapshot().delta_since(&pending.start_memory);

        let sample = PerformanceSample {
            request_id: pending.request_id,
            started_at_ms: pending.started_at_ms,
            method: pending.method,
            route: pending.route,
            status_code: status.as_u16(),
            duration_ms,
            memory_delta,
            slow: duration_ms > self.config.threshold_ms,
            caller_role,
            outcome,
        };

        metrics::record_sample(&sample.method, sample.status_code, sample.level(), duration_ms);
        if sample.slow {
            metrics::record_slow_request(&sample.method);
        }

        if self.config.log_all || sample.slow {
            self.log(&sample);
        }

        if let Some(store) = &self.store {
            store::persist_detached(store.clone(), sample, self.logger.clone());
        }
    }

    fn log(&self, sample: &PerformanceSample) {
        let Some(logger) = &self.logger else {
            self.console.write_line(&console_line(sample));
            return;
        };

        let meta = serde_json::to_value(sample).unwrap_or(Value::Null);
        if sample.slow {
            logger.warn("Slow request detected", &meta);
        } else {
            logger.info("Request completed", &meta);
        }
    }
}

/// Axum middleware entry point for the collector.
pub async fn collector_middleware(
    State(collector): State<Arc<Collector>>,
    req: Request,
    next: Next,
) -> Response {
    let pending = collector.begin(&req);
    let role_at_entry = context::role_of_request(&req);

    let mut response = next.run(req).await;

    let elapsed_ms = pending.started.elapsed().as_millis() as u64;
    apply_timing_headers(response.headers_mut(), elapsed_ms);

    let status = response.status();
    let caller_role = context::resolve_role(&response, role_at_entry);
    let request_id = pending.request_id.clone();

    response.map(move |body| {
        CompletionBody::wrap(body, move |outcome| {
            let finished = catch_unwind(AssertUnwindSafe(|| {
                collector.complete(pending, status, caller_role, outcome)
            }));
            if finished.is_err() {
                tracing::error!(
                    request_id = %request_id,
                    "Performance collector panicked while finalizing sample"
                );
            }
        })
    })
}

/// `"<METHOD> <route> <status> <n>ms"`, suffixed with `(slow)` when slow.
fn console_line(sample: &PerformanceSample) -> String {
    format!(
        "{} {} {} {}ms{}",
        sample.method,
        sample.route,
        sample.status_code,
        sample.duration_ms,
        if sample.slow { " (slow)" } else { "" }
    )
}

/// Set `X-Response-Time` and `X-Performance-Level` on a response head.
pub fn apply_timing_headers(headers: &mut HeaderMap, elapsed_ms: u64) {
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms}ms")) {
        headers.insert(X_RESPONSE_TIME, value);
    }
    let level = PerformanceLevel::from_duration_ms(elapsed_ms);
    headers.insert(X_PERFORMANCE_LEVEL, HeaderValue::from_static(level.as_str()));
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
