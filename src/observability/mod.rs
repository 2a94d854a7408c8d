//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Collector / Analyzer produce:
//!     → logging.rs (PerformanceLogger entries, tracing events)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, JSON)
//!     → Any metrics recorder the host application installs
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows into every sample
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{ConsoleSink, PerformanceLogger, StdoutConsole, TracingLogger};
