//! External performance data store seam.
//!
//! # Design Decisions
//! - Writes are fire-and-forget on a detached tokio task
//! - Errors and panics inside the task are caught and logged, never retried

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::{future::BoxFuture, FutureExt};
use serde_json::json;
use thiserror::Error;

use super::sample::PerformanceSample;
use crate::observability::{metrics, PerformanceLogger};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to persist sample: {0}")]
    Write(String),
}

/// Destination for finalized samples.
pub trait PerformanceStore: Send + Sync + 'static {
    fn save(&self, sample: PerformanceSample) -> BoxFuture<'static, Result<(), StoreError>>;
}

/// Persist `sample` without blocking the caller.
pub(crate) fn persist_detached(
    store: Arc<dyn PerformanceStore>,
    sample: PerformanceSample,
    logger: Option<Arc<dyn PerformanceLogger>>,
) {
    let request_id = sample.request_id.clone();
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            report(
                logger.as_deref(),
                "Performance sample dropped: no async runtime",
                &request_id,
                "runtime unavailable",
            );
            return;
        }
    };

    handle.spawn(async move {
        let write = AssertUnwindSafe(async move { store.save(sample).await })
            .catch_unwind()
            .await;
        let failure = match write {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => "store task panicked".to_string(),
        };
        metrics::record_store_failure();
        report(
            logger.as_deref(),
            "Failed to persist performance sample",
            &request_id,
            &failure,
        );
    });
}

fn report(logger: Option<&dyn PerformanceLogger>, message: &str, request_id: &str, error: &str) {
    match logger {
        Some(logger) => logger.error(message, &json!({ "requestId": request_id, "error": error })),
        None => tracing::error!(request_id = %request_id, error = %error, "{}", message),
    }
}
