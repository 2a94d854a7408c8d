//! Composition root for the three telemetry middlewares.
//!
//! The pipeline owns the shared `MetricsRegistry` and hands each
//! component its collaborators. `apply` layers the enabled components onto
//! a router; each one registers its own finish callback and they never
//! talk to each other.

use std::sync::Arc;

use axum::{middleware, Router};

use crate::analyzer::{analyzer_middleware, Analyzer, MetricsRegistry, Sampler};
use crate::collector::{collector_middleware, Collector, MemoryProbe, PerformanceStore};
use crate::config::TelemetryConfig;
use crate::observability::{ConsoleSink, PerformanceLogger, StdoutConsole, TracingLogger};
use crate::tracker::{tracker_middleware, Tracker};

pub struct TelemetryPipeline {
    collector: Option<Collector>,
    tracker: Option<Arc<Tracker>>,
    analyzer: Option<Analyzer>,
    registry: Arc<MetricsRegistry>,
    logger: Option<Arc<dyn PerformanceLogger>>,
    console: Arc<dyn ConsoleSink>,
}

impl TelemetryPipeline {
    pub fn from_config(config: &TelemetryConfig) -> Self {
        let registry = Arc::new(MetricsRegistry::new(
            config.analyzer.slow_threshold_ms,
            config.analyzer.max_endpoint_keys,
        ));

        Self {
            collector: config
                .collector
                .enabled
                .then(|| Collector::new(config.collector.clone())),
            tracker: config
                .tracker
                .enabled
                .then(|| Arc::new(Tracker::new(config.tracker.clone()))),
            analyzer: config
                .analyzer
                .enabled
                .then(|| Analyzer::new(config.analyzer.clone(), registry.clone())),
            registry,
            logger: Some(Arc::new(TracingLogger)),
            console: Arc::new(StdoutConsole),
        }
    }

    /// Route both the collector's and the analyzer's logging to `logger`.
    /// `None` selects the plain stdout fallback.
    pub fn with_logger(mut self, logger: Option<Arc<dyn PerformanceLogger>>) -> Self {
        self.collector = self.collector.map(|c| c.with_logger(logger.clone()));
        self.analyzer = self.analyzer.map(|a| a.with_logger(logger.clone()));
        self.logger = logger;
        self
    }

    /// Where the no-logger fallback lines go. Defaults to stdout.
    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.collector = self.collector.map(|c| c.with_console(console.clone()));
        self.analyzer = self.analyzer.map(|a| a.with_console(console.clone()));
        self.console = console;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn PerformanceStore>) -> Self {
        self.collector = self.collector.map(|c| c.with_store(store));
        self
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.analyzer = self.analyzer.map(|a| a.with_sampler(sampler));
        self
    }

    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.collector = self.collector.map(|c| c.with_memory_probe(probe));
        self
    }

    pub fn registry(&self) -> Arc<MetricsRegistry> {
        self.registry.clone()
    }

    pub fn logger(&self) -> Option<Arc<dyn PerformanceLogger>> {
        self.logger.clone()
    }

    pub fn console(&self) -> Arc<dyn ConsoleSink> {
        self.console.clone()
    }

    pub fn tracker(&self) -> Option<Arc<Tracker>> {
        self.tracker.clone()
    }

    /// Layer the enabled components onto `router`.
    ///
    /// Layers run per matched route, so `MatchedPath` is visible to all of
    /// them. The collector sits outermost so its timing covers the others.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let mut router = router;
        if let Some(analyzer) = self.analyzer {
            router = router.layer(middleware::from_fn_with_state(
                Arc::new(analyzer),
                analyzer_middleware,
            ));
        }
        if let Some(tracker) = self.tracker {
            router = router.layer(middleware::from_fn_with_state(tracker, tracker_middleware));
        }
        if let Some(collector) = self.collector {
            router = router.layer(middleware::from_fn_with_state(
                Arc::new(collector),
                collector_middleware,
            ));
        }
        router
    }
}
