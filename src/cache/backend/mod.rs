//! Storage Backends
//!
//! Uniform get/set/delete/keys contract over the three storage strategies:
//! - `MemoryBackend`: volatile in-process map
//! - `PersistentBackend`: JSON files shared by every context on the host
//! - `SessionBackend`: serialized entries private to one cache instance

mod memory;
mod persistent;
mod session;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::cache::{BackendKind, CacheEntry};
use crate::error::Result;

pub use memory::MemoryBackend;
pub use persistent::PersistentBackend;
pub use session::SessionBackend;

/// A storage strategy the cache can write entries to.
///
/// Unparseable stored entries are reported as absent by `get` and removed.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    fn kind(&self) -> BackendKind;

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn keys(&self) -> Result<Vec<String>>;

    async fn clear(&self) -> Result<()>;

    /// Records a successful read of `key`.
    ///
    /// Must not race with a concurrent `set` of the same key: the increment
    /// happens under the backend's own guard, or not at all.
    async fn touch(&self, key: &str) -> Result<()>;

    /// Deletes expired entries, returning how many were removed.
    async fn sweep_expired(&self, now_ms: u64) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys().await? {
            // Corrupt entries are dropped by `get` itself
            if let Some(entry) = self.get(&key).await? {
                if entry.is_expired(now_ms) && self.delete(&key).await? {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

/// Parses a stored entry, rejecting text that is not an entry for `key`.
pub(crate) fn decode_entry(key: &str, raw: &str) -> Option<CacheEntry> {
    serde_json::from_str::<CacheEntry>(raw)
        .ok()
        .filter(|entry| entry.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Payload;

    #[test]
    fn test_decode_entry_rejects_garbage() {
        assert!(decode_entry("k", "{not json").is_none());
    }

    #[test]
    fn test_decode_entry_rejects_foreign_key() {
        let entry = CacheEntry::new("other", Payload::Encoded("1".into()), 0, 10);
        let raw = serde_json::to_string(&entry).unwrap();

        assert!(decode_entry("k", &raw).is_none());
        assert_eq!(decode_entry("other", &raw), Some(entry));
    }
}
