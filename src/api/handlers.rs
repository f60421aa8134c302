//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints.

use axum::{extract::State, Json};

use crate::cache::{CacheStats, DatasetCache};
use crate::config::Config;
use crate::error::Result;
use crate::models::{
    ClearResponse, CleanupResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
    ToggleRequest, ToggleResponse,
};

/// Application state shared across all handlers.
///
/// `DatasetCache` is a cheap cloneable handle; no outer lock is needed.
#[derive(Clone)]
pub struct AppState {
    pub cache: DatasetCache,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: DatasetCache) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(DatasetCache::from_config(config)?))
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.cache.stats().await)
}

/// Handler for POST /invalidate
///
/// Invalidates matching keys and cascades to dependent datasets.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let pattern = req.key_pattern()?;
    let outcome = state.cache.invalidate(pattern, req.reason).await;

    Ok(Json(InvalidateResponse::new(req.pattern, req.reason, outcome)))
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::new())
}

/// Handler for POST /cleanup
///
/// Runs an expiry sweep immediately instead of waiting for the next tick.
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    Json(state.cache.cleanup_expired().await.into())
}

/// Handler for PUT /enabled
///
/// Switches caching on or off at runtime.
pub async fn toggle_handler(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> Json<ToggleResponse> {
    state.cache.set_enabled(req.enabled);
    Json(ToggleResponse {
        enabled: state.cache.is_enabled(),
    })
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.is_enabled()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BackendKind, CacheConfig, InvalidationReason};

    fn test_state() -> AppState {
        AppState::new(DatasetCache::builder().build().unwrap())
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();

        let response = stats_handler(State(state)).await;
        assert_eq!(response.total_hits, 0);
        assert_eq!(response.total_misses, 0);
    }

    #[tokio::test]
    async fn test_invalidate_handler() {
        let state = test_state();
        let config = CacheConfig::new(BackendKind::Memory);
        state.cache.set("events:1", &1, &config).await;
        state.cache.set("listView:1", &1, &config).await;

        let req = InvalidateRequest {
            pattern: "events".to_string(),
            regex: false,
            reason: InvalidationReason::Delete,
        };
        let response = invalidate_handler(State(state.clone()), Json(req))
            .await
            .unwrap();

        assert_eq!(response.removed, 2);
        assert_eq!(state.cache.stats().await.cache_size, 0);
    }

    #[tokio::test]
    async fn test_invalidate_invalid_regex() {
        let req = InvalidateRequest {
            pattern: "(".to_string(),
            regex: true,
            reason: InvalidationReason::Update,
        };
        let result = invalidate_handler(State(test_state()), Json(req)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_toggle_handler() {
        let state = test_state();

        let req = ToggleRequest { enabled: false };
        let response = toggle_handler(State(state.clone()), Json(req)).await;
        assert!(!response.enabled);
        assert!(!state.cache.is_enabled());
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler(State(test_state())).await;
        assert_eq!(response.status, "healthy");
        assert!(response.caching_enabled);
    }
}
