//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber's recv() completes → server drains → exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; any task can subscribe
//! - In-flight responses finish before exit, so their samples are still recorded

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
