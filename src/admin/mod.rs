//! Admin endpoints over the aggregate statistics.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::analyzer::MetricsRegistry;
use crate::observability::{ConsoleSink, PerformanceLogger};
use crate::tracker::Tracker;

#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<MetricsRegistry>,
    pub tracker: Option<Arc<Tracker>>,
    pub logger: Option<Arc<dyn PerformanceLogger>>,
    pub console: Arc<dyn ConsoleSink>,
    pub api_key: Option<String>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/_telemetry/status", get(get_status))
        .route("/_telemetry/stats", get(get_stats))
        .route("/_telemetry/flush", post(flush_stats))
        .route("/_telemetry/reset", post(reset_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
