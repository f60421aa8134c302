//! Session-scoped backend.
//!
//! Holds serialized entries for the lifetime of a single cache instance and
//! is never shared with other contexts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::backend::{decode_entry, StorageBackend};
use crate::cache::{BackendKind, CacheEntry};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct SessionBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl SessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn insert_raw(&self, key: &str, raw: &str) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), raw.to_string());
    }
}

#[async_trait]
impl StorageBackend for SessionBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Session
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let decoded = match self.entries.read().await.get(key) {
            Some(raw) => decode_entry(key, raw),
            None => return Ok(None),
        };

        if decoded.is_none() {
            warn!("Removing corrupt session cache entry '{}'", key);
            self.entries.write().await.remove(key);
        }
        Ok(decoded)
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<()> {
        let raw = serde_json::to_string(&entry)?;
        self.entries.write().await.insert(key.to_string(), raw);
        Ok(())
    }

    async fn touch(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        let Some(raw) = entries.get_mut(key) else {
            return Ok(());
        };

        if let Some(mut entry) = decode_entry(key, raw) {
            entry.hit_count += 1;
            *raw = serde_json::to_string(&entry)?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
