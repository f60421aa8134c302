//! Volatile in-process backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::backend::StorageBackend;
use crate::cache::eviction::{select_victims, Candidate, MemoryBudget};
use crate::cache::{BackendKind, CacheEntry};
use crate::error::Result;

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    seq: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    slots: HashMap<String, Slot>,
    next_seq: u64,
}

impl MemoryState {
    fn insert(&mut self, key: &str, entry: CacheEntry) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.insert(key.to_string(), Slot { entry, seq });
    }
}

// == Memory Backend ==
/// Shared in-process map. Every mutation takes the write guard, so budget
/// enforcement never races with a concurrent insert.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry and evicts the oldest entries until `budget` holds.
    ///
    /// Returns the evicted keys. Insertion and eviction happen under one guard.
    pub async fn insert_within_budget(
        &self,
        key: &str,
        entry: CacheEntry,
        budget: &MemoryBudget,
    ) -> Vec<String> {
        let mut state = self.state.write().await;
        state.insert(key, entry);

        let victims = {
            let candidates = state
                .slots
                .iter()
                .map(|(key, slot)| Candidate {
                    key,
                    created_at: slot.entry.created_at,
                    seq: slot.seq,
                    size_bytes: slot.entry.size_bytes,
                })
                .collect();
            select_victims(candidates, budget)
        };

        for victim in &victims {
            state.slots.remove(victim);
        }
        victims
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of entries still fresh at `now_ms`.
    pub async fn fresh_count(&self, now_ms: u64) -> usize {
        self.state
            .read()
            .await
            .slots
            .values()
            .filter(|slot| !slot.entry.is_expired(now_ms))
            .count()
    }

    /// Sum of the estimated sizes of all entries.
    pub async fn total_size(&self) -> usize {
        self.state
            .read()
            .await
            .slots
            .values()
            .map(|slot| slot.entry.size_bytes)
            .sum()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        Ok(self
            .state
            .read()
            .await
            .slots
            .get(key)
            .map(|slot| slot.entry.clone()))
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()> {
        self.state.write().await.insert(key, entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.state.write().await.slots.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.state.read().await.slots.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.state.write().await.slots.clear();
        Ok(())
    }

    async fn touch(&self, key: &str) -> Result<()> {
        if let Some(slot) = self.state.write().await.slots.get_mut(key) {
            slot.entry.hit_count += 1;
        }
        Ok(())
    }

    async fn sweep_expired(&self, now_ms: u64) -> Result<usize> {
        let mut state = self.state.write().await;
        let before = state.slots.len();
        state.slots.retain(|_, slot| !slot.entry.is_expired(now_ms));
        Ok(before - state.slots.len())
    }
}
