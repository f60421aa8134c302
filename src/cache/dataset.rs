//! Dataset Module
//!
//! Logical datasets the cache knows about and the per-dataset caching policy.
//!
//! Keys are namespaced as `<dataset>:<rest>`, e.g. `events:2024-05`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Dataset ==
/// Enumerated logical datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dataset {
    #[serde(rename = "events")]
    Events,
    #[serde(rename = "templates")]
    Templates,
    #[serde(rename = "user-preferences")]
    UserPreferences,
    #[serde(rename = "campaigns")]
    Campaigns,
    #[serde(rename = "analytics")]
    Analytics,
    #[serde(rename = "monthView")]
    MonthView,
    #[serde(rename = "weekView")]
    WeekView,
    #[serde(rename = "dayView")]
    DayView,
    #[serde(rename = "listView")]
    ListView,
}

impl Dataset {
    pub const ALL: [Dataset; 9] = [
        Dataset::Events,
        Dataset::Templates,
        Dataset::UserPreferences,
        Dataset::Campaigns,
        Dataset::Analytics,
        Dataset::MonthView,
        Dataset::WeekView,
        Dataset::DayView,
        Dataset::ListView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Events => "events",
            Dataset::Templates => "templates",
            Dataset::UserPreferences => "user-preferences",
            Dataset::Campaigns => "campaigns",
            Dataset::Analytics => "analytics",
            Dataset::MonthView => "monthView",
            Dataset::WeekView => "weekView",
            Dataset::DayView => "dayView",
            Dataset::ListView => "listView",
        }
    }

    /// Key prefix shared by every entry of this dataset.
    pub fn namespace(&self) -> String {
        format!("{}:", self.as_str())
    }

    /// Builds a namespaced key, e.g. `Dataset::Events.key("2024-05")`.
    pub fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.as_str(), suffix)
    }

    /// Dataset owning a namespaced key, if any.
    pub fn of_key(key: &str) -> Option<Dataset> {
        let (prefix, _) = key.split_once(':')?;
        prefix.parse().ok()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dataset {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        Dataset::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CacheError::InvalidRequest(format!("Unknown dataset: {}", s)))
    }
}

// == Backend Kind ==
/// Storage strategy a dataset is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Volatile in-process map
    Memory,
    /// Persistent store shared by every context on the host
    Local,
    /// Store scoped to one cache instance
    Session,
}

// == Invalidation Reason ==
/// Kind of write that caused an invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationReason {
    Create,
    Update,
    Delete,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InvalidationReason::Create => "create",
            InvalidationReason::Update => "update",
            InvalidationReason::Delete => "delete",
        };
        f.write_str(s)
    }
}

// == Cache Config ==
/// Caching policy for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: BackendKind,
    pub ttl_ms: u64,
    /// Maximum entries kept for the dataset in the memory backend
    pub max_entries: usize,
    /// Store the value as pre-serialized JSON text
    pub compress: bool,
    /// Write kinds that cascade invalidation to dependent datasets
    pub invalidate_on: BTreeSet<InvalidationReason>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            ttl_ms: 5 * 60 * 1000,
            max_entries: 1000,
            compress: false,
            invalidate_on: BTreeSet::new(),
        }
    }
}

impl CacheConfig {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn invalidate_on(mut self, reasons: impl IntoIterator<Item = InvalidationReason>) -> Self {
        self.invalidate_on = reasons.into_iter().collect();
        self
    }

    fn validate(&self, dataset: Dataset) -> Result<()> {
        if self.ttl_ms == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "Dataset '{}' has a zero TTL",
                dataset
            )));
        }
        if self.max_entries == 0 {
            return Err(CacheError::InvalidConfig(format!(
                "Dataset '{}' has max_entries = 0",
                dataset
            )));
        }
        Ok(())
    }
}

// == Cache Registry ==
/// Static map from dataset to its caching policy, supplied at startup.
#[derive(Debug, Clone, Default)]
pub struct CacheRegistry {
    configs: HashMap<Dataset, CacheConfig>,
}

impl CacheRegistry {
    /// Creates an empty registry; unregistered datasets use `CacheConfig::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dataset: Dataset, config: CacheConfig) -> Self {
        self.configs.insert(dataset, config);
        self
    }

    /// Policy for a dataset, or the default policy if it was never registered.
    pub fn config(&self, dataset: Dataset) -> CacheConfig {
        self.configs.get(&dataset).cloned().unwrap_or_default()
    }

    pub fn get(&self, dataset: Dataset) -> Option<&CacheConfig> {
        self.configs.get(&dataset)
    }

    pub fn validate(&self) -> Result<()> {
        self.configs
            .iter()
            .try_for_each(|(dataset, config)| config.validate(*dataset))
    }

    /// Policies used by the calendar and analytics views.
    pub fn standard() -> Self {
        use InvalidationReason::*;

        const MINUTE: u64 = 60 * 1000;
        let view = CacheConfig::new(BackendKind::Memory)
            .with_ttl_ms(5 * MINUTE)
            .with_max_entries(100);

        Self::new()
            .with(
                Dataset::Events,
                CacheConfig::new(BackendKind::Memory)
                    .with_ttl_ms(5 * MINUTE)
                    .with_max_entries(500)
                    .invalidate_on([Create, Update, Delete]),
            )
            .with(
                Dataset::Templates,
                CacheConfig::new(BackendKind::Local)
                    .with_ttl_ms(60 * MINUTE)
                    .with_max_entries(200)
                    .with_compress(true),
            )
            .with(
                Dataset::UserPreferences,
                CacheConfig::new(BackendKind::Session)
                    .with_ttl_ms(30 * MINUTE)
                    .with_max_entries(50)
                    .invalidate_on([Update]),
            )
            .with(
                Dataset::Campaigns,
                CacheConfig::new(BackendKind::Memory)
                    .with_ttl_ms(10 * MINUTE)
                    .with_max_entries(500)
                    .invalidate_on([Create, Update, Delete]),
            )
            .with(
                Dataset::Analytics,
                CacheConfig::new(BackendKind::Memory)
                    .with_ttl_ms(15 * MINUTE)
                    .with_max_entries(100)
                    .with_compress(true),
            )
            .with(Dataset::MonthView, view.clone())
            .with(Dataset::WeekView, view.clone())
            .with(Dataset::DayView, view.clone())
            .with(Dataset::ListView, view)
    }
}
