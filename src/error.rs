//! Error types for the dataset cache
//!
//! Provides unified error handling using thiserror. Runtime storage faults are
//! absorbed inside the cache façade; these variants surface only from backend
//! internals, startup validation and the admin API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the dataset cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Persistent storage could not be read or written
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry or value could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Startup configuration is inconsistent (unknown dataset, dependency cycle, bad regex)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid request data on the admin API
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) | CacheError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Io(_) | CacheError::Serialization(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the dataset cache.
pub type Result<T> = std::result::Result<T, CacheError>;
