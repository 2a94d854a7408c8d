//! Shared utilities for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use request_telemetry::analyzer::Sampler;
use request_telemetry::collector::{
    MemoryProbe, MemoryUsage, PerformanceSample, PerformanceStore, StoreError,
};
use request_telemetry::config::TelemetryConfig;
use request_telemetry::observability::{ConsoleSink, PerformanceLogger};
use request_telemetry::{TelemetryPipeline, TelemetryServer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    pub meta: Value,
}

/// Logger that keeps every entry for later assertions.
#[derive(Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn with_message(&self, message: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.message == message)
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.entries().iter().filter(|e| e.level == level).count()
    }

    fn push(&self, level: Level, message: &str, meta: &Value) {
        self.entries.lock().push(LogEntry {
            level,
            message: message.to_string(),
            meta: meta.clone(),
        });
    }
}

impl PerformanceLogger for RecordingLogger {
    fn info(&self, message: &str, meta: &Value) {
        self.push(Level::Info, message, meta);
    }

    fn warn(&self, message: &str, meta: &Value) {
        self.push(Level::Warn, message, meta);
    }

    fn error(&self, message: &str, meta: &Value) {
        self.push(Level::Error, message, meta);
    }
}

/// Logger whose every call panics.
pub struct PanickingLogger;

impl PerformanceLogger for PanickingLogger {
    fn info(&self, _message: &str, _meta: &Value) {
        panic!("logger exploded")
    }

    fn warn(&self, _message: &str, _meta: &Value) {
        panic!("logger exploded")
    }

    fn error(&self, _message: &str, _meta: &Value) {
        panic!("logger exploded")
    }
}

/// Console that keeps the fallback lines.
#[derive(Default)]
pub struct RecordingConsole {
    lines: Mutex<Vec<String>>,
}

impl RecordingConsole {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl ConsoleSink for RecordingConsole {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Store that keeps samples in memory.
#[derive(Default)]
pub struct MemoryStore {
    samples: Mutex<Vec<PerformanceSample>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn samples(&self) -> Vec<PerformanceSample> {
        self.samples.lock().clone()
    }
}

impl PerformanceStore for MemoryStore {
    fn save(&self, sample: PerformanceSample) -> BoxFuture<'static, Result<(), StoreError>> {
        self.samples.lock().push(sample);
        Box::pin(async { Ok(()) })
    }
}

/// Store whose writes always fail.
pub struct FailingStore;

impl PerformanceStore for FailingStore {
    fn save(&self, _sample: PerformanceSample) -> BoxFuture<'static, Result<(), StoreError>> {
        Box::pin(async { Err(StoreError::Unavailable("connection refused".into())) })
    }
}

/// Store that panics as soon as a write is attempted.
pub struct PanickingStore;

impl PerformanceStore for PanickingStore {
    fn save(&self, _sample: PerformanceSample) -> BoxFuture<'static, Result<(), StoreError>> {
        panic!("store exploded")
    }
}

/// Sampler that always draws the same value.
pub struct FixedSampler(pub f64);

impl Sampler for FixedSampler {
    fn draw(&self) -> f64 {
        self.0
    }
}

/// Probe that reports fixed heap growth per snapshot.
#[derive(Default)]
pub struct SteppingProbe {
    calls: Mutex<u64>,
}

impl MemoryProbe for SteppingProbe {
    fn snapshot(&self) -> MemoryUsage {
        let mut calls = self.calls.lock();
        *calls += 1;
        MemoryUsage {
            rss_bytes: 4096 * *calls,
            heap_live_bytes: 1024 * *calls,
            ..MemoryUsage::default()
        }
    }
}

/// Config with every component on and admin auth off.
pub fn test_config() -> TelemetryConfig {
    let mut config = TelemetryConfig::default();
    config.collector.memory_profiling = false;
    config.analyzer.sample_rate = 1.0;
    config
}

/// Build the full demo app around `pipeline`.
pub fn app(config: TelemetryConfig, pipeline: TelemetryPipeline) -> Router {
    TelemetryServer::with_pipeline(config, pipeline).router()
}

/// Send `request` and read the whole body.
pub async fn send(app: &Router, request: Request<Body>) -> (Response<()>, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    (Response::from_parts(parts, ()), bytes.to_vec())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

/// Let detached tasks (store writes) run to completion.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Pipeline for `config` reporting to `logger`.
pub fn pipeline(config: &TelemetryConfig, logger: &Arc<RecordingLogger>) -> TelemetryPipeline {
    let logger: Arc<dyn PerformanceLogger> = logger.clone();
    TelemetryPipeline::from_config(config).with_logger(Some(logger))
}

/// Parse `"<n>ms"` from `X-Response-Time`.
pub fn response_time_ms<B>(response: &Response<B>) -> u64 {
    response.headers()["x-response-time"]
        .to_str()
        .unwrap()
        .trim_end_matches("ms")
        .parse()
        .unwrap()
}
