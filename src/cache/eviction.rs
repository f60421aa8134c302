//! Eviction & Expiry Module
//!
//! Age-based budget enforcement for the memory backend and the periodic
//! expiry sweep over every backend.
//!
//! Eviction order is oldest `created_at` first. Reads do not refresh an
//! entry's position, so this is not LRU.

use tracing::{debug, warn};

use crate::cache::backend::StorageBackend;
use crate::cache::BackendKind;

// == Memory Budget ==
/// Limits applied to the memory backend after each insertion.
#[derive(Debug, Clone)]
pub struct MemoryBudget {
    /// Ceiling on the summed `size_bytes` of all memory entries
    pub max_bytes: usize,
    /// Namespace of the dataset just written, if the key has one
    pub namespace: Option<String>,
    /// Entry limit inside that namespace
    pub max_entries: usize,
}

/// Eviction candidate as seen by the victim selection.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub key: &'a str,
    pub created_at: u64,
    /// Insertion sequence, breaks ties between entries written in the same millisecond
    pub seq: u64,
    pub size_bytes: usize,
}

// == Select Victims ==
/// Picks the keys to evict so that the namespace holds at most
/// `max_entries` and the total size is at most `max_bytes`.
pub fn select_victims(mut candidates: Vec<Candidate<'_>>, budget: &MemoryBudget) -> Vec<String> {
    candidates.sort_by_key(|c| (c.created_at, c.seq));

    let mut victims = vec![false; candidates.len()];

    if let Some(namespace) = &budget.namespace {
        let in_namespace: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.key.starts_with(namespace.as_str()))
            .map(|(i, _)| i)
            .collect();

        let excess = in_namespace.len().saturating_sub(budget.max_entries);
        for &i in in_namespace.iter().take(excess) {
            victims[i] = true;
        }
    }

    let mut total: usize = candidates
        .iter()
        .zip(&victims)
        .filter(|(_, evicted)| !**evicted)
        .map(|(c, _)| c.size_bytes)
        .sum();

    for (i, candidate) in candidates.iter().enumerate() {
        if total <= budget.max_bytes {
            break;
        }
        if !victims[i] {
            victims[i] = true;
            total -= candidate.size_bytes;
        }
    }

    candidates
        .iter()
        .zip(victims)
        .filter(|(_, evicted)| *evicted)
        .map(|(c, _)| c.key.to_string())
        .collect()
}

// == Sweep ==
/// Result of one expiry sweep across all backends.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SweepReport {
    pub removed: usize,
    pub failed: Vec<BackendKind>,
}

/// Removes expired entries from every backend.
///
/// A failing backend is logged and recorded; the others are still swept.
pub async fn sweep_backends(backends: &[&dyn StorageBackend], now_ms: u64) -> SweepReport {
    let mut report = SweepReport::default();

    for backend in backends {
        match backend.sweep_expired(now_ms).await {
            Ok(removed) => {
                debug!("Sweep of {:?} backend removed {} entries", backend.kind(), removed);
                report.removed += removed;
            }
            Err(err) => {
                warn!("Sweep of {:?} backend failed: {}", backend.kind(), err);
                report.failed.push(backend.kind());
            }
        }
    }

    report
}
