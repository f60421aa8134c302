//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries from
//! every backend.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::DatasetCache;

/// Spawns a background task that sweeps expired entries every
/// `cleanup_interval_secs` seconds.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = DatasetCache::builder().build()?;
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: DatasetCache, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            // Sleep for the configured interval
            tokio::time::sleep(interval).await;

            let report = cache.cleanup_expired().await;

            for kind in &report.failed {
                warn!("TTL cleanup: {:?} backend could not be swept", kind);
            }
            if report.removed > 0 {
                info!("TTL cleanup: removed {} expired entries", report.removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BackendKind, CacheConfig, ManualClock};
    use std::sync::Arc;

    fn cache_at(clock: &ManualClock) -> DatasetCache {
        DatasetCache::builder()
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_removes_expired_entries() {
        let clock = ManualClock::new(1_000);
        let cache = cache_at(&clock);
        let config = CacheConfig::new(BackendKind::Memory).with_ttl_ms(500);

        cache.set("events:expire_soon", &"value", &config).await;
        clock.advance(1_000);

        let handle = spawn_cleanup_task(cache.clone(), 1);

        // Let the first sweep run
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert!(
            cache.inspect("events:expire_soon", BackendKind::Memory).await.is_none(),
            "Expired entry should have been cleaned up"
        );
        assert!(cache.stats().await.last_cleanup.is_some());

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_preserves_valid_entries() {
        let clock = ManualClock::new(1_000);
        let cache = cache_at(&clock);
        let config = CacheConfig::new(BackendKind::Memory).with_ttl_ms(3_600_000);

        cache.set("events:long_lived", &"value", &config).await;

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        assert_eq!(
            cache.get::<String>("events:long_lived", &config).await.as_deref(),
            Some("value"),
            "Valid entry should not be removed"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = DatasetCache::builder().build().unwrap();

        let handle = spawn_cleanup_task(cache, 1);

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
