//! Cached Loader Module
//!
//! Per-dataset wrapper used by data loaders: builds namespaced keys, applies
//! the dataset's registered policy and honours the cache's runtime toggle.

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};

use crate::cache::{
    CacheConfig, Dataset, DatasetCache, InvalidationOutcome, InvalidationReason, KeyPattern,
};

#[derive(Debug, Clone)]
pub struct CachedLoader {
    cache: DatasetCache,
    dataset: Dataset,
    config: CacheConfig,
}

impl CachedLoader {
    pub fn new(cache: DatasetCache, dataset: Dataset) -> Self {
        let config = cache.config_for(dataset);
        Self {
            cache,
            dataset,
            config,
        }
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Loads `<dataset>:<suffix>`, calling `fetch` on a miss or whenever
    /// caching is switched off.
    pub async fn load<T, F, Fut>(&self, suffix: &str, fetch: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let key = self.dataset.key(suffix);
        self.cache.get_or_refresh(&key, &self.config, fetch).await
    }

    /// Invalidates the whole dataset after a write to its source records.
    pub async fn invalidate(&self, reason: InvalidationReason) -> InvalidationOutcome {
        self.cache
            .invalidate(KeyPattern::Namespace(self.dataset), reason)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_load_caches_under_namespace() {
        let cache = DatasetCache::builder().build().unwrap();
        let loader = CachedLoader::new(cache.clone(), Dataset::Campaigns);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = loader
                .load("42", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2])
                })
                .await;
            assert_eq!(value, Some(vec![1, 2]));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.get::<Vec<i32>>("campaigns:42", loader.config()).await,
            Some(vec![1, 2])
        );
    }

    #[tokio::test]
    async fn test_toggle_makes_loader_pass_through() {
        let cache = DatasetCache::builder().build().unwrap();
        let loader = CachedLoader::new(cache.clone(), Dataset::Events);
        let calls = AtomicUsize::new(0);

        cache.set_enabled(false);
        for _ in 0..2 {
            loader
                .load("today", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(0u8)
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_cascades_from_dataset() {
        let cache = DatasetCache::builder().build().unwrap();
        let events = CachedLoader::new(cache.clone(), Dataset::Events);
        let month = CachedLoader::new(cache.clone(), Dataset::MonthView);

        events.load("1", || async { Ok(1) }).await;
        month.load("2024-05", || async { Ok(31) }).await;

        let outcome = events.invalidate(InvalidationReason::Create).await;

        assert_eq!(outcome.removed, 2);
        assert!(outcome.cascaded.contains(&Dataset::MonthView));
        assert_eq!(cache.get::<i32>("monthView:2024-05", month.config()).await, None);
    }
}
