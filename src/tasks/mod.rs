//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired entries from every backend at a fixed interval
//! - Cross-Context Sync: Drops volatile entries changed by other contexts

mod cleanup;
mod sync;

pub use cleanup::spawn_cleanup_task;
pub use sync::spawn_sync_task;
