//! Admin HTTP surface for the cache layer

pub mod admin;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use state::CacheState;

/// Builds the cache admin router, intended to be nested under the host
/// application's admin scope.
pub fn create_cache_router(state: CacheState) -> Router {
    Router::new()
        .route("/cache/stats", get(admin::cache_stats))
        .route("/cache/warm", post(admin::trigger_warming))
        .route("/cache/warming/start", post(admin::start_warming_schedule))
        .route("/cache/warming/stop", post(admin::stop_warming_schedule))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
