use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use super::AdminState;
use crate::analyzer::StatsSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub active_progress_sessions: usize,
    pub progress_ticks_emitted: u64,
    pub endpoint_keys: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let (active, ticks) = state
        .tracker
        .as_ref()
        .map(|t| (t.active_sessions(), t.ticks_emitted()))
        .unwrap_or((0, 0));

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        active_progress_sessions: active,
        progress_ticks_emitted: ticks,
        endpoint_keys: state.registry.endpoint_keys().len(),
    })
}

pub async fn get_stats(State(state): State<AdminState>) -> Json<StatsSnapshot> {
    Json(state.registry.snapshot())
}

pub async fn flush_stats(State(state): State<AdminState>) -> Json<StatsSnapshot> {
    Json(
        state
            .registry
            .flush_to(state.logger.as_deref(), state.console.as_ref()),
    )
}

pub async fn reset_stats(State(state): State<AdminState>) -> StatusCode {
    state.registry.reset();
    tracing::info!("Aggregate statistics reset");
    StatusCode::NO_CONTENT
}
