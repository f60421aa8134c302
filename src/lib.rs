//! Dataset Cache - in-process caching layer for analytics and calendar data
//!
//! Multi-backend cache (memory, persistent, session) with TTL expiry,
//! age-based budget eviction, cascading invalidation and cross-context sync,
//! plus an admin HTTP surface for stats and invalidation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CachedLoader, DatasetCache};
pub use config::Config;
pub use tasks::{spawn_cleanup_task, spawn_sync_task};
