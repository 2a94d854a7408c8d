//! Sampled per-endpoint / per-role aggregation.
//!
//! # Data Flow
//! ```text
//! request entry
//!     → one sampling draw (skip everything if not sampled)
//!     → endpoint key "<METHOD> <route>", role at entry
//! finish event
//!     → MetricsRegistry::record (endpoint, role, overall)
//!     → every `flush_every` sampled requests: snapshot logged at info
//! ```
//!
//! # Design Decisions
//! - The finish callback runs under `catch_unwind`, like the collector's;
//!   a failing logger never unwinds into the response body

pub mod registry;
pub mod sampler;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tokio::time::Instant;

use crate::config::AnalyzerConfig;
use crate::http::body::CompletionBody;
use crate::http::context;
use crate::observability::{metrics, ConsoleSink, PerformanceLogger, StdoutConsole, TracingLogger};

pub use registry::{
    AggregateBucket, BucketStats, MetricsRegistry, StatsSnapshot, OVERFLOW_ENDPOINT_KEY,
};
pub use sampler::{RandomSampler, Sampler};

pub struct Analyzer {
    config: AnalyzerConfig,
    registry: Arc<MetricsRegistry>,
    sampler: Arc<dyn Sampler>,
    logger: Option<Arc<dyn PerformanceLogger>>,
    console: Arc<dyn ConsoleSink>,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig, registry: Arc<MetricsRegistry>) -> Self {
        Self {
            config,
            registry,
            sampler: Arc::new(RandomSampler),
            logger: Some(Arc::new(TracingLogger)),
            console: Arc::new(StdoutConsole),
        }
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = sampler;
        self
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

    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn should_sample(&self) -> bool {
        let sampled = self.sampler.should_sample(self.config.sample_rate);
        metrics::record_sampling_decision(sampled);
        sampled
    }

    /// Fold one finished request into the registry.
    pub fn observe(&self, endpoint: &str, role: &str, duration_ms: u64) {
        let overall = self.registry.record(endpoint, role, duration_ms);
        let every = self.config.flush_every;
        if every > 0 && overall % every == 0 {
            self.registry
                .flush_to(self.logger.as_deref(), self.console.as_ref());
        }
    }
}

/// Axum middleware entry point for the analyzer.
pub async fn analyzer_middleware(
    State(analyzer): State<Arc<Analyzer>>,
    req: Request,
    next: Next,
) -> Response {
    if !analyzer.should_sample() {
        return next.run(req).await;
    }

    let started = Instant::now();
    let endpoint = context::endpoint_key(req.method(), &context::route_of(&req));
    let role_at_entry = context::role_of_request(&req);

    let response = next.run(req).await;
    let role = context::resolve_role(&response, role_at_entry);

    response.map(move |body| {
        CompletionBody::wrap(body, move |_| {
            let duration_ms = started.elapsed().as_millis() as u64;
            let observed = catch_unwind(AssertUnwindSafe(|| {
                analyzer.observe(&endpoint, &role, duration_ms)
            }));
            if observed.is_err() {
                tracing::error!(
                    endpoint = %endpoint,
                    "Performance analyzer panicked while recording a request"
                );
            }
        })
    })
}
