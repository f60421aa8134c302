//! Cache Statistics Module
//!
//! Running hit/miss/eviction counters and the snapshot exported to monitoring.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Stats Counters ==
/// Counters updated by cache operations. Shared across clones of the cache.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    /// Unix ms of the last sweep, 0 when none ran yet
    last_cleanup: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Eviction ==
    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_cleanup(&self, now_ms: u64) {
        self.last_cleanup.store(now_ms, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn last_cleanup_ms(&self) -> Option<u64> {
        match self.last_cleanup.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Zeroes the hit/miss/eviction counters.
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}

// == Cache Stats ==
/// Point-in-time view of cache performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_hits: u64,
    pub total_misses: u64,
    /// hits / (hits + misses), 0.0 before any read
    pub hit_rate: f64,
    /// Non-expired entries in the memory backend
    pub cache_size: usize,
    /// Estimated bytes held by the memory backend
    pub memory_usage: usize,
    pub evictions: u64,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub last_invalidation: Option<DateTime<Utc>>,
}

impl CacheStats {
    pub fn hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Converts Unix milliseconds to a UTC timestamp.
pub fn to_datetime(ms: u64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(i64::try_from(ms).ok()?)
}
