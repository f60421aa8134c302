//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies. Statistics are
//! returned as [`crate::cache::CacheStats`] directly.

use serde::Serialize;

use crate::cache::{BackendKind, Dataset, InvalidationOutcome, InvalidationReason, SweepReport};

/// Response body for POST /invalidate
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub pattern: String,
    pub reason: InvalidationReason,
    /// Entries removed, cascades included
    pub removed: usize,
    /// Dependent datasets cleared by the cascade
    pub cascaded: Vec<Dataset>,
}

impl InvalidateResponse {
    pub fn new(
        pattern: impl Into<String>,
        reason: InvalidationReason,
        outcome: InvalidationOutcome,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            reason,
            removed: outcome.removed,
            cascaded: outcome.cascaded,
        }
    }
}

/// Response body for POST /cleanup
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
    pub failed: Vec<BackendKind>,
}

impl From<SweepReport> for CleanupResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            removed: report.removed,
            failed: report.failed,
        }
    }
}

/// Response body for DELETE /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared successfully".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for PUT /enabled
#[derive(Debug, Clone, Serialize)]
pub struct ToggleResponse {
    pub enabled: bool,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Whether caching is currently switched on
    pub caching_enabled: bool,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(caching_enabled: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            caching_enabled,
        }
    }
}
