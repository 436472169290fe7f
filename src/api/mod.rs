//! API Module
//!
//! HTTP surface for inspecting and invalidating the shared cache.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /cache/stats` - Cache statistics
//! - `DELETE /cache/keys/:key` - Delete one key
//! - `POST /cache/invalidate` - Delete keys matching a pattern
//! - `POST /cache/clear-expired` - Sweep expired entries
//! - `POST /cache/clear` - Delete every key

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
