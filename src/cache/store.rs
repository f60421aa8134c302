//! Cache Store Module
//!
//! Public façade over the storage backends: read-through `get`, `set`,
//! `invalidate`, `preload`, `clear` and `stats`.
//!
//! Storage and refresh faults never reach the caller. They are logged and
//! degrade to a cache miss, or to a stale value when a refresh fails.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::cache::backend::{MemoryBackend, PersistentBackend, SessionBackend, StorageBackend};
use crate::cache::eviction::{sweep_backends, MemoryBudget, SweepReport};
use crate::cache::invalidation::{InvalidationEngine, InvalidationOutcome, KeyPattern};
use crate::cache::stats::{to_datetime, CacheStats, StatsCounters};
use crate::cache::sync::{evict_changed, ChangePublisher, ChangeSource, ContextId, StorageChange};
use crate::cache::{
    BackendKind, CacheConfig, CacheEntry, CacheRegistry, Clock, Dataset, DependencyGraph,
    InvalidationReason, Payload, SystemClock,
};
use crate::config::Config;
use crate::error::Result;

type Fetcher = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<Value>> + Send>;

// == Preload Entry ==
/// One dataset value to warm: its key, policy and how to fetch it.
pub struct PreloadEntry {
    key: String,
    config: CacheConfig,
    fetcher: Fetcher,
}

impl PreloadEntry {
    pub fn new<T, F, Fut>(key: impl Into<String>, config: CacheConfig, fetcher: F) -> Self
    where
        T: Serialize + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let fetcher: Fetcher = Box::new(move || {
            async move {
                let value = fetcher().await?;
                Ok(serde_json::to_value(value)?)
            }
            .boxed()
        });

        Self {
            key: key.into(),
            config,
            fetcher,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

enum Lookup<T> {
    Fresh(T),
    Stale(T),
    Missing,
}

#[derive(Debug)]
struct Inner {
    memory: MemoryBackend,
    local: PersistentBackend,
    session: SessionBackend,
    registry: CacheRegistry,
    graph: DependencyGraph,
    clock: Arc<dyn Clock>,
    counters: StatsCounters,
    enabled: AtomicBool,
    max_memory_bytes: usize,
    context: ContextId,
    invalidations: watch::Sender<Option<u64>>,
}

// == Dataset Cache ==
/// Handle to one cache instance. Clones share the same storage and counters.
#[derive(Debug, Clone)]
pub struct DatasetCache {
    inner: Arc<Inner>,
}

// == Builder ==
pub struct CacheBuilder {
    registry: CacheRegistry,
    graph: DependencyGraph,
    clock: Arc<dyn Clock>,
    max_memory_bytes: usize,
    persistent_dir: Option<PathBuf>,
    change_sender: Option<broadcast::Sender<StorageChange>>,
    enabled: bool,
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self {
            registry: CacheRegistry::standard(),
            graph: DependencyGraph::standard(),
            clock: Arc::new(SystemClock),
            max_memory_bytes: Config::default().max_memory_bytes,
            persistent_dir: None,
            change_sender: None,
            enabled: true,
        }
    }
}

impl CacheBuilder {
    pub fn registry(mut self, registry: CacheRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_memory_bytes(mut self, max: usize) -> Self {
        self.max_memory_bytes = max;
        self
    }

    /// Directory of the persistent backend. Without one it stays unavailable.
    pub fn persistent_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persistent_dir = Some(dir.into());
        self
    }

    /// Announce persistent writes on `source` so other contexts can react.
    pub fn change_source(mut self, source: &dyn ChangeSource) -> Self {
        self.change_sender = source.sender();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validates the dataset policies and dependency graph, then builds the cache.
    pub fn build(self) -> Result<DatasetCache> {
        self.registry.validate()?;
        self.graph.validate()?;

        let context = ContextId::next();
        let mut local = match self.persistent_dir {
            Some(dir) => PersistentBackend::open(dir),
            None => PersistentBackend::unavailable(),
        };
        if let Some(tx) = self.change_sender {
            local = local.with_publisher(ChangePublisher::new(tx, context));
        }

        let (invalidations, _) = watch::channel(None);

        Ok(DatasetCache {
            inner: Arc::new(Inner {
                memory: MemoryBackend::new(),
                local,
                session: SessionBackend::new(),
                registry: self.registry,
                graph: self.graph,
                clock: self.clock,
                counters: StatsCounters::new(),
                enabled: AtomicBool::new(self.enabled),
                max_memory_bytes: self.max_memory_bytes,
                context,
                invalidations,
            }),
        })
    }
}

impl DatasetCache {
    // == Constructors ==
    pub fn builder() -> CacheBuilder {
        CacheBuilder::default()
    }

    /// Builds a cache from process settings with the standard dataset policies.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder()
            .max_memory_bytes(config.max_memory_bytes)
            .enabled(config.cache_enabled);
        if let Some(dir) = &config.cache_dir {
            builder = builder.persistent_dir(dir);
        }
        builder.build()
    }

    // == Accessors ==
    pub fn context_id(&self) -> ContextId {
        self.inner.context
    }

    pub fn registry(&self) -> &CacheRegistry {
        &self.inner.registry
    }

    /// Policy registered for a dataset.
    pub fn config_for(&self, dataset: Dataset) -> CacheConfig {
        self.inner.registry.config(dataset)
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Runtime switch. While disabled, reads go straight to the refresh
    /// function and nothing is stored.
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.inner.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!("Caching {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    fn now(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    fn backend(&self, kind: BackendKind) -> &dyn StorageBackend {
        match kind {
            BackendKind::Memory => &self.inner.memory,
            BackendKind::Local => &self.inner.local,
            BackendKind::Session => &self.inner.session,
        }
    }

    fn backends(&self) -> [&dyn StorageBackend; 3] {
        [&self.inner.memory, &self.inner.local, &self.inner.session]
    }

    async fn discard(&self, backend: &dyn StorageBackend, key: &str) {
        if let Err(err) = backend.delete(key).await {
            warn!("Could not remove '{}' from {:?}: {}", key, backend.kind(), err);
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str, config: &CacheConfig) -> Lookup<T> {
        let backend = self.backend(config.backend);

        let entry = match backend.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return Lookup::Missing,
            Err(err) => {
                warn!("Cache read of '{}' failed: {}", key, err);
                return Lookup::Missing;
            }
        };

        let value = match entry.value.decode::<T>() {
            Ok(value) => value,
            Err(err) => {
                warn!("Discarding undecodable cache entry '{}': {}", key, err);
                self.discard(backend, key).await;
                return Lookup::Missing;
            }
        };

        if entry.is_expired(self.now()) {
            return Lookup::Stale(value);
        }

        if let Err(err) = backend.touch(key).await {
            debug!("Could not record hit on '{}': {}", key, err);
        }
        self.inner.counters.record_hit();
        Lookup::Fresh(value)
    }

    // == Get ==
    /// Returns the cached value if present and not expired.
    ///
    /// An expired entry counts as a miss but stays stored until the next
    /// sweep, so a later failed refresh can still fall back to it.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, config: &CacheConfig) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }

        match self.lookup(key, config).await {
            Lookup::Fresh(value) => Some(value),
            Lookup::Stale(_) | Lookup::Missing => {
                self.inner.counters.record_miss();
                None
            }
        }
    }

    // == Get Or Refresh ==
    /// Read-through get.
    ///
    /// On a miss `refresh` is awaited and its value stored. If it fails the
    /// expired value is returned when one exists, otherwise `None`. No
    /// timeout is applied to `refresh`.
    pub async fn get_or_refresh<T, F, Fut>(
        &self,
        key: &str,
        config: &CacheConfig,
        refresh: F,
    ) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if !self.is_enabled() {
            return match refresh().await {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!("Refresh of '{}' failed: {:#}", key, err);
                    None
                }
            };
        }

        let stale = match self.lookup(key, config).await {
            Lookup::Fresh(value) => return Some(value),
            Lookup::Stale(value) => Some(value),
            Lookup::Missing => None,
        };
        self.inner.counters.record_miss();

        match refresh().await {
            Ok(value) => {
                self.set(key, &value, config).await;
                Some(value)
            }
            Err(err) if stale.is_some() => {
                warn!("Refresh of '{}' failed, serving stale value: {:#}", key, err);
                stale
            }
            Err(err) => {
                warn!("Refresh of '{}' failed: {:#}", key, err);
                None
            }
        }
    }

    // == Set ==
    /// Writes a value through the backend named by `config`.
    ///
    /// Writes to the memory backend evict the oldest entries while the memory
    /// ceiling or the dataset's entry limit is exceeded.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, config: &CacheConfig) {
        if !self.is_enabled() {
            return;
        }

        let payload = match Payload::encode(value, config.compress) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("Not caching '{}': {}", key, err);
                return;
            }
        };
        let entry = CacheEntry::new(key, payload, self.now(), config.ttl_ms);

        match config.backend {
            BackendKind::Memory => {
                let budget = MemoryBudget {
                    max_bytes: self.inner.max_memory_bytes,
                    namespace: Dataset::of_key(key).map(|d| d.namespace()),
                    max_entries: config.max_entries,
                };
                let evicted = self
                    .inner
                    .memory
                    .insert_within_budget(key, entry, &budget)
                    .await;
                if !evicted.is_empty() {
                    debug!("Evicted {} entries to stay within budget", evicted.len());
                    self.inner.counters.record_evictions(evicted.len());
                }
            }
            kind => {
                if let Err(err) = self.backend(kind).set(key, entry).await {
                    warn!("Cache write of '{}' to {:?} failed: {}", key, kind, err);
                }
            }
        }
    }

    /// Returns the raw entry without touching statistics or hit counts.
    pub async fn inspect(&self, key: &str, kind: BackendKind) -> Option<CacheEntry> {
        self.backend(kind).get(key).await.ok().flatten()
    }

    async fn has_fresh(&self, key: &str, config: &CacheConfig) -> bool {
        self.inspect(key, config.backend)
            .await
            .map_or(false, |entry| !entry.is_expired(self.now()))
    }

    // == Preload ==
    /// Fetches and stores every entry that has no fresh cached value.
    ///
    /// Fetches run concurrently. Returns how many entries were stored.
    pub async fn preload(&self, entries: Vec<PreloadEntry>) -> usize {
        if !self.is_enabled() {
            return 0;
        }

        let mut pending = Vec::new();
        for entry in entries {
            if self.has_fresh(&entry.key, &entry.config).await {
                debug!("Preload of '{}' skipped, already fresh", entry.key);
            } else {
                pending.push(entry);
            }
        }

        let fetches = pending.into_iter().map(|entry| async move {
            let result = (entry.fetcher)().await;
            (entry.key, entry.config, result)
        });

        let mut stored = 0;
        for (key, config, result) in join_all(fetches).await {
            match result {
                Ok(value) => {
                    self.set(&key, &value, &config).await;
                    stored += 1;
                }
                Err(err) => warn!("Preload of '{}' failed: {:#}", key, err),
            }
        }
        stored
    }

    // == Invalidate ==
    /// Removes matching entries from every backend and cascades to dependent
    /// datasets. A pattern matching nothing is a no-op.
    pub async fn invalidate(
        &self,
        pattern: impl Into<KeyPattern>,
        reason: InvalidationReason,
    ) -> InvalidationOutcome {
        let pattern = pattern.into();
        let backends = self.backends();
        let engine = InvalidationEngine::new(&backends, &self.inner.registry, &self.inner.graph);
        let outcome = engine.run(&pattern, reason).await;

        self.inner.invalidations.send_replace(Some(self.now()));
        info!(
            "Invalidated {:?} on {}: {} entries removed, cascaded to {:?}",
            pattern, reason, outcome.removed, outcome.cascaded
        );
        outcome
    }

    /// Unix ms of the most recent invalidation.
    pub fn last_invalidation(&self) -> Option<u64> {
        *self.inner.invalidations.borrow()
    }

    /// Notifies on every invalidation, for layers that refetch uncached data.
    pub fn subscribe_invalidations(&self) -> watch::Receiver<Option<u64>> {
        self.inner.invalidations.subscribe()
    }

    // == Cleanup Expired ==
    /// Sweeps expired entries from every backend.
    pub async fn cleanup_expired(&self) -> SweepReport {
        let now = self.now();
        let report = sweep_backends(&self.backends(), now).await;
        self.inner.counters.record_cleanup(now);
        report
    }

    // == Clear ==
    /// Empties every backend and resets the counters.
    pub async fn clear(&self) {
        for backend in self.backends() {
            if let Err(err) = backend.clear().await {
                warn!("Could not clear {:?} backend: {}", backend.kind(), err);
            }
        }
        self.inner.counters.reset();
        info!("Cache cleared");
    }

    // == Cross-Context Sync ==
    /// Drops the volatile copy of a key another context changed.
    pub async fn apply_external_change(&self, change: &StorageChange) -> usize {
        match evict_changed(&self.inner.memory, change, self.inner.context).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!("Could not apply storage change {:?}: {}", change, err);
                0
            }
        }
    }

    /// Drops every volatile entry, used when change notifications were lost.
    pub async fn drop_volatile(&self) {
        if let Err(err) = self.inner.memory.clear().await {
            warn!("Could not drop volatile entries: {}", err);
        }
    }

    // == Stats ==
    pub async fn stats(&self) -> CacheStats {
        let now = self.now();
        let counters = &self.inner.counters;
        let (hits, misses) = (counters.hits(), counters.misses());

        CacheStats {
            total_hits: hits,
            total_misses: misses,
            hit_rate: CacheStats::hit_rate(hits, misses),
            cache_size: self.inner.memory.fresh_count(now).await,
            memory_usage: self.inner.memory.total_size().await,
            evictions: counters.evictions(),
            last_cleanup: counters.last_cleanup_ms().and_then(to_datetime),
            last_invalidation: self.last_invalidation().and_then(to_datetime),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    const START: u64 = 1_700_000_000_000;

    fn cache_with_clock() -> (DatasetCache, ManualClock) {
        let clock = ManualClock::new(START);
        let cache = DatasetCache::builder()
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        (cache, clock)
    }

    fn memory_config(ttl_ms: u64) -> CacheConfig {
        CacheConfig::new(BackendKind::Memory).with_ttl_ms(ttl_ms)
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(5_000);

        cache.set("events:2024-05", &json!({"count": 3}), &config).await;
        let value: Option<Value> = cache.get("events:2024-05", &config).await;

        assert_eq!(value, Some(json!({"count": 3})));
        let entry = cache.inspect("events:2024-05", BackendKind::Memory).await.unwrap();
        assert_eq!(entry.hit_count, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_without_refresh() {
        let (cache, clock) = cache_with_clock();
        let config = memory_config(5_000);

        cache.set("events:2024-05", &1u32, &config).await;
        clock.advance(6_000);

        assert_eq!(cache.get::<u32>("events:2024-05", &config).await, None);
        assert_eq!(cache.stats().await.total_misses, 1);
        assert!(cache.inspect("events:2024-05", BackendKind::Memory).await.is_some());

        cache.cleanup_expired().await;
        assert!(cache.inspect("events:2024-05", BackendKind::Memory).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_fallback_survives_plain_get() {
        let (cache, clock) = cache_with_clock();
        let config = memory_config(1_000);

        cache.set("analytics:q1", &"old", &config).await;
        clock.advance(2_000);
        assert_eq!(cache.get::<String>("analytics:q1", &config).await, None);

        let value: Option<String> = cache
            .get_or_refresh("analytics:q1", &config, || async { Err(anyhow!("upstream down")) })
            .await;
        assert_eq!(value.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_refresh_on_miss_stores_value() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(5_000);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = cache
                .get_or_refresh("campaigns:1", &config, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("fresh".to_string())
                })
                .await;
            assert_eq!(value.as_deref(), Some("fresh"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!((stats.total_hits, stats.total_misses), (1, 1));
    }

    #[tokio::test]
    async fn test_refresh_failure_serves_stale() {
        let (cache, clock) = cache_with_clock();
        let config = memory_config(1_000);

        cache.set("analytics:q1", &"old", &config).await;
        clock.advance(2_000);

        let value: Option<String> = cache
            .get_or_refresh("analytics:q1", &config, || async { Err(anyhow!("upstream down")) })
            .await;
        assert_eq!(value.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_refresh_failure_without_stale_is_none() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(1_000);

        let value: Option<String> = cache
            .get_or_refresh("analytics:q1", &config, || async { Err(anyhow!("upstream down")) })
            .await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_compressed_values_round_trip() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(1_000).with_compress(true);

        cache.set("templates:1", &vec![1, 2, 3], &config).await;

        let entry = cache.inspect("templates:1", BackendKind::Memory).await.unwrap();
        assert_eq!(entry.value, Payload::Encoded("[1,2,3]".to_string()));
        assert_eq!(cache.get::<Vec<i32>>("templates:1", &config).await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_dropped() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(1_000);

        cache.set("events:1", &"text", &config).await;

        assert_eq!(cache.get::<u64>("events:1", &config).await, None);
        assert!(cache.inspect("events:1", BackendKind::Memory).await.is_none());
    }

    #[tokio::test]
    async fn test_session_backend_used_when_configured() {
        let (cache, _) = cache_with_clock();
        let config = CacheConfig::new(BackendKind::Session).with_ttl_ms(1_000);

        cache.set("user-preferences:7", &"dark", &config).await;

        assert!(cache.inspect("user-preferences:7", BackendKind::Session).await.is_some());
        assert!(cache.inspect("user-preferences:7", BackendKind::Memory).await.is_none());
        assert_eq!(cache.stats().await.cache_size, 0);
    }

    #[tokio::test]
    async fn test_unavailable_persistent_backend_degrades_to_miss() {
        let (cache, _) = cache_with_clock();
        let config = CacheConfig::new(BackendKind::Local).with_ttl_ms(1_000);

        cache.set("templates:1", &"x", &config).await;
        assert_eq!(cache.get::<String>("templates:1", &config).await, None);

        let value = cache
            .get_or_refresh("templates:1", &config, || async { Ok("from source".to_string()) })
            .await;
        assert_eq!(value.as_deref(), Some("from source"));
    }

    #[tokio::test]
    async fn test_disabled_cache_passes_through() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(5_000);
        cache.set_enabled(false);

        for expected in ["first", "second"] {
            let value = cache
                .get_or_refresh("events:1", &config, || async move { Ok(expected.to_string()) })
                .await;
            assert_eq!(value.as_deref(), Some(expected));
        }
        assert!(cache.inspect("events:1", BackendKind::Memory).await.is_none());

        cache.set_enabled(true);
        cache.set("events:1", &"cached", &config).await;
        assert_eq!(cache.get::<String>("events:1", &config).await.as_deref(), Some("cached"));
    }

    #[tokio::test]
    async fn test_memory_budget_evicts_oldest() {
        let clock = ManualClock::new(START);
        let cache = DatasetCache::builder()
            .clock(Arc::new(clock.clone()))
            .max_memory_bytes(100)
            .build()
            .unwrap();
        let config = memory_config(60_000);

        for i in 0..5 {
            cache.set(&format!("dayView:{}", i), &"x".repeat(20), &config).await;
            clock.advance(1);
        }

        let stats = cache.stats().await;
        assert!(stats.memory_usage <= 100);
        assert!(stats.evictions > 0);
        assert!(cache.inspect("dayView:0", BackendKind::Memory).await.is_none());
        assert!(cache.inspect("dayView:4", BackendKind::Memory).await.is_some());
    }

    #[tokio::test]
    async fn test_dataset_entry_limit() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(60_000).with_max_entries(2);

        for i in 0..4 {
            cache.set(&format!("weekView:{}", i), &i, &config).await;
        }
        cache.set("events:1", &1, &config).await;

        assert!(cache.inspect("weekView:0", BackendKind::Memory).await.is_none());
        assert!(cache.inspect("weekView:1", BackendKind::Memory).await.is_none());
        assert!(cache.inspect("weekView:3", BackendKind::Memory).await.is_some());
        assert_eq!(cache.stats().await.cache_size, 3);
    }

    #[tokio::test]
    async fn test_preload_skips_fresh_entries() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(60_000);
        let calls = Arc::new(AtomicUsize::new(0));

        let batch = |calls: Arc<AtomicUsize>| {
            vec![PreloadEntry::new("templates:all", config.clone(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["welcome", "promo"])
            })]
        };

        assert_eq!(cache.preload(batch(calls.clone())).await, 1);
        assert_eq!(cache.preload(batch(calls.clone())).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preload_failure_stores_nothing() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(60_000);

        let stored = cache
            .preload(vec![
                PreloadEntry::new("events:ok", config.clone(), || async { Ok(1) }),
                PreloadEntry::new("events:bad", config.clone(), || async {
                    Err::<i32, _>(anyhow!("boom"))
                }),
            ])
            .await;

        assert_eq!(stored, 1);
        assert!(cache.inspect("events:bad", BackendKind::Memory).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_updates_timestamp_and_notifies() {
        let (cache, clock) = cache_with_clock();
        let mut rx = cache.subscribe_invalidations();
        assert_eq!(cache.last_invalidation(), None);

        clock.advance(10);
        cache.invalidate("nothing", InvalidationReason::Update).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(START + 10));
        assert!(cache.stats().await.last_invalidation.is_some());
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let (cache, _) = cache_with_clock();
        let config = memory_config(60_000);

        cache.set("events:1", &1, &config).await;
        cache.set("user-preferences:1", &1, &CacheConfig::new(BackendKind::Session)).await;
        let _ = cache.get::<i32>("events:1", &config).await;
        let _ = cache.get::<i32>("events:2", &config).await;

        cache.clear().await;

        let stats = cache.stats().await;
        assert_eq!((stats.total_hits, stats.total_misses, stats.cache_size), (0, 0, 0));
        assert!(cache.inspect("user-preferences:1", BackendKind::Session).await.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_sweeps_and_records_time() {
        let (cache, clock) = cache_with_clock();

        cache.set("events:1", &1, &memory_config(1_000)).await;
        cache.set("events:2", &2, &memory_config(10_000)).await;
        clock.advance(5_000);

        let report = cache.cleanup_expired().await;
        assert_eq!(report.removed, 1);
        assert!(report.failed.is_empty());

        let stats = cache.stats().await;
        assert_eq!(stats.cache_size, 1);
        assert_eq!(stats.last_cleanup, to_datetime(START + 5_000));
    }

    #[test]
    fn test_build_rejects_cyclic_graph() {
        let graph = DependencyGraph::new()
            .with_dependents(Dataset::Events, [Dataset::ListView])
            .with_dependents(Dataset::ListView, [Dataset::Events]);

        assert!(DatasetCache::builder().graph(graph).build().is_err());
    }
}
