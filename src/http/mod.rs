//! HTTP plumbing shared by the telemetry middlewares, plus the demo server.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, timeout, caller role)
//!     → collector → tracker → analyzer (per matched route)
//!     → routes.rs (simulated handlers)
//!     → body.rs (finish event when the response body ends)
//! ```

pub mod body;
pub mod context;
pub mod routes;
pub mod server;

pub use body::{CompletionBody, RequestOutcome};
pub use context::{CallerRole, ANONYMOUS_ROLE, X_CALLER_ROLE, X_REQUEST_ID};
pub use server::TelemetryServer;
