//! Cache administration endpoints

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::info;

use super::state::CacheState;

/// Warming trigger outcome
#[derive(Debug, Serialize)]
pub struct WarmingResponse {
    pub status: &'static str,
}

/// Returns key count and memory usage of the cache backend
pub async fn cache_stats(State(state): State<CacheState>) -> impl IntoResponse {
    let stats = state.stats.stats().await;

    (StatusCode::OK, Json(stats))
}

/// Triggers a single warming pass in the background.
///
/// Responds 202 once the pass is spawned; 409 when a pass is already in
/// flight. The pass outcome is visible in logs, not in this response.
pub async fn trigger_warming(State(state): State<CacheState>) -> impl IntoResponse {
    if state.warming.is_warming() {
        return (
            StatusCode::CONFLICT,
            Json(WarmingResponse {
                status: "already_running",
            }),
        );
    }

    info!("Manual warming pass requested");
    let warming = state.warming.clone();
    tokio::spawn(async move {
        warming.warm_once().await;
    });

    (StatusCode::ACCEPTED, Json(WarmingResponse { status: "started" }))
}

/// Starts the periodic warming schedule
pub async fn start_warming_schedule(State(state): State<CacheState>) -> impl IntoResponse {
    state.warming.start();

    (StatusCode::OK, Json(WarmingResponse { status: "scheduled" }))
}

/// Stops the periodic warming schedule; an in-flight pass completes
pub async fn stop_warming_schedule(State(state): State<CacheState>) -> impl IntoResponse {
    state.warming.stop();

    (StatusCode::OK, Json(WarmingResponse { status: "stopped" }))
}
