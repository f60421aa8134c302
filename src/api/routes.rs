//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cleanup_handler, clear_handler, health_handler, invalidate_handler, stats_handler,
    toggle_handler, AppState,
};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /stats` - Cache statistics
/// - `POST /invalidate` - Invalidate keys by pattern
/// - `DELETE /clear` - Empty every backend
/// - `POST /cleanup` - Run an expiry sweep now
/// - `PUT /enabled` - Switch caching on or off
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (the admin surface is meant for local tooling)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/stats", get(stats_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/clear", delete(clear_handler))
        .route("/cleanup", post(cleanup_handler))
        .route("/enabled", put(toggle_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
