//! Cross-Context Sync Module
//!
//! Storage-change notifications between cache instances ("contexts") sharing
//! the persistent backend. A context that receives a change for a key drops
//! its volatile copy, so the next read falls through to persistent storage or
//! to the refresh callback.
//!
//! This gives eventual consistency between contexts, not linearizability.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::cache::backend::{MemoryBackend, StorageBackend};
use crate::error::Result;

// == Context Id ==
/// Identifies one cache instance within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ContextId(u64);

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

impl ContextId {
    pub fn next() -> Self {
        ContextId(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

// == Storage Change ==
/// A write to the shared persistent backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    /// Changed key; `None` when the whole store was cleared
    pub key: Option<String>,
    /// Context that made the change
    pub origin: ContextId,
}

// == Change Source ==
/// Where external change notifications come from.
pub trait ChangeSource: Send + Sync + Debug {
    /// A receiver for notifications, or `None` when the environment has none.
    fn subscribe(&self) -> Option<broadcast::Receiver<StorageChange>>;

    /// Sender used to announce this context's own writes.
    fn sender(&self) -> Option<broadcast::Sender<StorageChange>>;
}

/// For environments without cross-context notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChangeSource;

impl ChangeSource for NoopChangeSource {
    fn subscribe(&self) -> Option<broadcast::Receiver<StorageChange>> {
        None
    }

    fn sender(&self) -> Option<broadcast::Sender<StorageChange>> {
        None
    }
}

/// Notification bus shared by every context that holds a clone.
#[derive(Debug, Clone)]
pub struct BroadcastChangeSource {
    tx: broadcast::Sender<StorageChange>,
}

impl BroadcastChangeSource {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl ChangeSource for BroadcastChangeSource {
    fn subscribe(&self) -> Option<broadcast::Receiver<StorageChange>> {
        Some(self.tx.subscribe())
    }

    fn sender(&self) -> Option<broadcast::Sender<StorageChange>> {
        Some(self.tx.clone())
    }
}

// == Change Publisher ==
/// Tags outgoing notifications with the publishing context.
#[derive(Debug, Clone)]
pub struct ChangePublisher {
    tx: broadcast::Sender<StorageChange>,
    origin: ContextId,
}

impl ChangePublisher {
    pub fn new(tx: broadcast::Sender<StorageChange>, origin: ContextId) -> Self {
        Self { tx, origin }
    }

    pub fn publish(&self, key: Option<&str>) {
        // No subscribers is not an error
        let _ = self.tx.send(StorageChange {
            key: key.map(str::to_string),
            origin: self.origin,
        });
    }
}

// == Apply Change ==
/// Drops the volatile copy affected by `change`.
///
/// Changes made by `own` are ignored. Returns the number of entries removed.
pub async fn evict_changed(
    memory: &MemoryBackend,
    change: &StorageChange,
    own: ContextId,
) -> Result<usize> {
    if change.origin == own {
        return Ok(0);
    }

    match &change.key {
        Some(key) => {
            let removed = memory.delete(key).await?;
            if removed {
                debug!("{} changed '{}', dropped local copy", change.origin, key);
            }
            Ok(usize::from(removed))
        }
        None => {
            let count = memory.len().await;
            memory.clear().await?;
            debug!("{} cleared shared storage, dropped {} local entries", change.origin, count);
            Ok(count)
        }
    }
}
