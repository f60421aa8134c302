//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::{InvalidationReason, KeyPattern};
use crate::error::{CacheError, Result};

/// Request body for POST /invalidate
///
/// # Fields
/// - `pattern`: Substring (or regex when `regex` is true) matched against keys
/// - `regex`: Treat `pattern` as a regular expression
/// - `reason`: Write kind that caused the invalidation
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
    #[serde(default)]
    pub regex: bool,
    pub reason: InvalidationReason,
}

impl InvalidateRequest {
    /// Validates the request and builds the key pattern.
    pub fn key_pattern(&self) -> Result<KeyPattern> {
        if self.pattern.is_empty() {
            return Err(CacheError::InvalidRequest(
                "Pattern cannot be empty".to_string(),
            ));
        }
        if self.regex {
            KeyPattern::regex(&self.pattern)
        } else {
            Ok(KeyPattern::from(self.pattern.as_str()))
        }
    }
}

/// Request body for PUT /enabled
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleRequest {
    pub enabled: bool,
}
