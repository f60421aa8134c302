//! Cache Entry Module
//!
//! Defines the unit of storage: a payload plus the metadata used for TTL
//! expiry, hit accounting and memory budget enforcement.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// == Payload ==
/// The cached value, opaque to the cache.
///
/// `Encoded` holds the value pre-serialized to JSON text, used when a dataset
/// is configured with `compress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Payload {
    Json(Value),
    Encoded(String),
}

impl Payload {
    /// Serializes a value into a payload.
    pub fn encode<T: Serialize + ?Sized>(value: &T, compress: bool) -> Result<Self> {
        if compress {
            Ok(Payload::Encoded(serde_json::to_string(value)?))
        } else {
            Ok(Payload::Json(serde_json::to_value(value)?))
        }
    }

    /// Deserializes the payload back into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Payload::Json(value) => Ok(T::deserialize(value)?),
            Payload::Encoded(text) => Ok(serde_json::from_str(text)?),
        }
    }

    /// Estimated size of the payload in bytes.
    pub fn estimated_size(&self) -> usize {
        match self {
            Payload::Json(value) => serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0),
            Payload::Encoded(text) => text.len(),
        }
    }
}

// == Cache Entry ==
/// A single cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key, unique within a backend
    pub key: String,
    /// The stored value
    pub value: Payload,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Time to live in milliseconds
    pub ttl_ms: u64,
    /// Number of successful reads
    pub hit_count: u64,
    /// Estimated footprint in bytes (key plus payload)
    pub size_bytes: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry written at `created_at`.
    pub fn new(key: impl Into<String>, value: Payload, created_at: u64, ttl_ms: u64) -> Self {
        let key = key.into();
        let size_bytes = key.len() + value.estimated_size();

        Self {
            key,
            value,
            created_at,
            ttl_ms,
            hit_count: 0,
            size_bytes,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: the entry is expired as soon as the full TTL has
    /// elapsed, i.e. when `now_ms >= created_at + ttl_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at()
    }

    /// Timestamp at which the entry stops being fresh.
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.ttl_ms)
    }

    // == Time To Live ==
    /// Remaining TTL in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at().saturating_sub(now_ms)
    }
}
