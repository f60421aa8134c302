//! Cross-Context Sync Task
//!
//! Listens for storage-change notifications from other contexts and drops the
//! matching volatile entries.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{ChangeSource, DatasetCache};

/// Spawns the listener, or returns `None` when `source` delivers no
/// notifications (e.g. [`crate::cache::NoopChangeSource`]).
///
/// Lost notifications (receiver lag) drop every volatile entry, since the
/// changed keys are unknown.
pub fn spawn_sync_task(cache: DatasetCache, source: &dyn ChangeSource) -> Option<JoinHandle<()>> {
    let mut rx = source.subscribe()?;

    Some(tokio::spawn(async move {
        info!("Cross-context sync started for {}", cache.context_id());

        loop {
            match rx.recv().await {
                Ok(change) => {
                    let removed = cache.apply_external_change(&change).await;
                    if removed > 0 {
                        debug!("Sync dropped {} stale local entries", removed);
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Sync missed {} change notifications, dropping volatile cache", missed);
                    cache.drop_volatile().await;
                }
                Err(RecvError::Closed) => {
                    info!("Change source closed, stopping sync for {}", cache.context_id());
                    break;
                }
            }
        }
    }))
}
