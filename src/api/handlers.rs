//! API Handlers
//!
//! HTTP request handlers for the cache administration endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::{CacheManager, CacheStats};
use crate::error::{DataError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The same manager the service façades read through
    pub cache: Arc<CacheManager>,
}

impl AppState {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.len()))
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Handler for DELETE /cache/keys/:key
pub async fn delete_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let removed = state.cache.clear(&key);
    Json(DeleteResponse::new(key, removed))
}

/// Handler for POST /cache/invalidate
///
/// Removes every key matching the regular expression in the body.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let pattern = req.compile().map_err(DataError::InvalidRequest)?;
    let removed = state.cache.invalidate_pattern(&pattern);
    info!(pattern = %req.pattern, removed, "invalidated via admin api");

    Ok(Json(InvalidateResponse {
        pattern: req.pattern,
        removed,
    }))
}

/// Handler for POST /cache/clear-expired
pub async fn clear_expired_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse {
        removed: state.cache.clear_expired(),
    })
}

/// Handler for POST /cache/clear
pub async fn clear_all_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.len();
    state.cache.clear_all();
    Json(ClearResponse { removed })
}
