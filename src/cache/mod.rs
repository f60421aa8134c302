//! Cache Module
//!
//! Multi-backend dataset cache with TTL expiry, age-based budget eviction,
//! cascading invalidation and cross-context sync.

pub mod backend;
mod clock;
mod dataset;
mod dependency;
mod entry;
pub mod eviction;
mod invalidation;
mod loader;
mod stats;
mod store;
pub mod sync;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use dataset::{BackendKind, CacheConfig, CacheRegistry, Dataset, InvalidationReason};
pub use dependency::DependencyGraph;
pub use entry::{CacheEntry, Payload};
pub use eviction::SweepReport;
pub use invalidation::{InvalidationEngine, InvalidationOutcome, KeyPattern};
pub use loader::CachedLoader;
pub use stats::CacheStats;
pub use store::{CacheBuilder, DatasetCache, PreloadEntry};
pub use sync::{BroadcastChangeSource, ChangeSource, ContextId, NoopChangeSource, StorageChange};
