//! Request performance telemetry for Axum services.
//!
//! Three independent middlewares share one request lifecycle:
//! the collector times and memory-profiles every request, the tracker
//! streams progress for slow POST/PUT work, and the analyzer keeps sampled
//! per-endpoint and per-role aggregates.

pub mod admin;
pub mod analyzer;
pub mod collector;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod tracker;

pub use config::TelemetryConfig;
pub use http::TelemetryServer;
pub use lifecycle::Shutdown;
pub use pipeline::TelemetryPipeline;
