//! API Routes
//!
//! Configures the Axum router with the cache administration endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_all_handler, clear_expired_handler, delete_key_handler, health_handler,
    invalidate_handler, stats_handler, AppState,
};

/// Creates the router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check with current entry count
/// - `GET /cache/stats` - Size, keys, hits, misses and hit rate
/// - `DELETE /cache/keys/:key` - Remove one key
/// - `POST /cache/invalidate` - Remove every key matching a regex
/// - `POST /cache/clear-expired` - Sweep expired entries now
/// - `POST /cache/clear` - Remove everything
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/keys/:key", delete(delete_key_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/cache/clear-expired", post(clear_expired_handler))
        .route("/cache/clear", post(clear_all_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
