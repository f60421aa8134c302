//! Configuration Module
//!
//! Loads process-wide cache settings from environment variables. Per-dataset
//! policies live in [`crate::cache::CacheRegistry`].

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Process-wide cache settings.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ceiling on the estimated size of the memory backend, in bytes
    pub max_memory_bytes: usize,
    /// Expiry sweep interval in seconds
    pub cleanup_interval: u64,
    /// Admin HTTP server port
    pub server_port: u16,
    /// Whether caching starts enabled
    pub cache_enabled: bool,
    /// Directory of the persistent backend; `None` leaves it unavailable
    pub cache_dir: Option<PathBuf>,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_MEMORY_BYTES` - Memory backend ceiling (default: 50 MiB)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    /// - `CACHE_ENABLED` - `true`/`false` (default: true)
    /// - `CACHE_DIR` - Persistent backend directory (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_memory_bytes: env_or("MAX_MEMORY_BYTES", defaults.max_memory_bytes),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_enabled: env_or("CACHE_ENABLED", defaults.cache_enabled),
            cache_dir: env::var_os("CACHE_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_memory_bytes: 50 * 1024 * 1024,
            cleanup_interval: 60,
            server_port: 3000,
            cache_enabled: true,
            cache_dir: None,
        }
    }
}
