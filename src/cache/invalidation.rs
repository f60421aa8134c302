//! Invalidation Engine
//!
//! Removes every entry matching a key pattern from every backend, then
//! cascades to the dependent datasets declared in the [`DependencyGraph`]
//! when the invalidated dataset's policy lists the write reason.

use std::collections::{BTreeSet, VecDeque};

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::backend::StorageBackend;
use crate::cache::{CacheRegistry, Dataset, DependencyGraph, InvalidationReason};
use crate::error::{CacheError, Result};

// == Key Pattern ==
/// Which keys an invalidation applies to.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Keys containing the string
    Substring(String),
    /// Keys the regex matches
    Regex(Regex),
    /// Every key in a dataset's namespace
    Namespace(Dataset),
}

impl KeyPattern {
    /// Compiles a regex pattern.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(KeyPattern::Regex)
            .map_err(|err| CacheError::InvalidRequest(format!("Invalid regex: {}", err)))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Substring(needle) => key.contains(needle.as_str()),
            KeyPattern::Regex(regex) => regex.is_match(key),
            KeyPattern::Namespace(dataset) => key.starts_with(&dataset.namespace()),
        }
    }

    /// Datasets the pattern names directly, e.g. `"events"` or `"events:2024"`.
    fn named_datasets(&self) -> BTreeSet<Dataset> {
        match self {
            KeyPattern::Substring(text) => text
                .parse::<Dataset>()
                .ok()
                .or_else(|| Dataset::of_key(text))
                .into_iter()
                .collect(),
            KeyPattern::Regex(regex) => Dataset::ALL
                .into_iter()
                .filter(|d| regex.is_match(d.as_str()))
                .collect(),
            KeyPattern::Namespace(dataset) => BTreeSet::from([*dataset]),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(value: &str) -> Self {
        KeyPattern::Substring(value.to_string())
    }
}

impl From<String> for KeyPattern {
    fn from(value: String) -> Self {
        KeyPattern::Substring(value)
    }
}

impl From<Regex> for KeyPattern {
    fn from(value: Regex) -> Self {
        KeyPattern::Regex(value)
    }
}

impl From<Dataset> for KeyPattern {
    fn from(value: Dataset) -> Self {
        KeyPattern::Namespace(value)
    }
}

// == Outcome ==
/// What an invalidation removed.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct InvalidationOutcome {
    /// Entries removed across all backends, cascades included
    pub removed: usize,
    /// Dependent datasets cleared by the cascade, in visit order
    pub cascaded: Vec<Dataset>,
}

// == Engine ==
pub struct InvalidationEngine<'a> {
    backends: &'a [&'a dyn StorageBackend],
    registry: &'a CacheRegistry,
    graph: &'a DependencyGraph,
}

impl<'a> InvalidationEngine<'a> {
    pub fn new(
        backends: &'a [&'a dyn StorageBackend],
        registry: &'a CacheRegistry,
        graph: &'a DependencyGraph,
    ) -> Self {
        Self {
            backends,
            registry,
            graph,
        }
    }

    pub async fn run(
        &self,
        pattern: &KeyPattern,
        reason: InvalidationReason,
    ) -> InvalidationOutcome {
        let mut outcome = InvalidationOutcome::default();

        let mut roots = self.remove_matching(pattern, &mut outcome).await;
        roots.extend(pattern.named_datasets());

        // A root that does not cascade can still be a dependent of one that
        // does, and then its whole namespace has to go
        let mut queue: VecDeque<Dataset> = roots
            .into_iter()
            .filter(|d| self.cascades(*d, reason))
            .collect();
        let mut visited: BTreeSet<Dataset> = queue.iter().copied().collect();

        while let Some(dataset) = queue.pop_front() {
            for dependent in self.graph.dependents(dataset) {
                if !visited.insert(dependent) {
                    continue;
                }
                self.remove_matching(&KeyPattern::Namespace(dependent), &mut outcome)
                    .await;
                outcome.cascaded.push(dependent);
                debug!("Invalidation of '{}' cascaded to '{}'", dataset, dependent);

                if self.cascades(dependent, reason) {
                    queue.push_back(dependent);
                }
            }
        }

        outcome
    }

    fn cascades(&self, dataset: Dataset, reason: InvalidationReason) -> bool {
        self.registry
            .get(dataset)
            .map_or(false, |config| config.invalidate_on.contains(&reason))
    }

    /// Deletes matching keys everywhere; returns the datasets they belonged to.
    async fn remove_matching(
        &self,
        pattern: &KeyPattern,
        outcome: &mut InvalidationOutcome,
    ) -> BTreeSet<Dataset> {
        let mut touched = BTreeSet::new();

        for backend in self.backends {
            let keys = match backend.keys().await {
                Ok(keys) => keys,
                Err(err) => {
                    warn!("Could not list {:?} backend keys: {}", backend.kind(), err);
                    continue;
                }
            };

            for key in keys.iter().filter(|key| pattern.matches(key)) {
                match backend.delete(key).await {
                    Ok(true) => {
                        outcome.removed += 1;
                        touched.extend(Dataset::of_key(key));
                    }
                    Ok(false) => {}
                    Err(err) => warn!(
                        "Could not delete '{}' from {:?}: {}",
                        key,
                        backend.kind(),
                        err
                    ),
                }
            }
        }

        touched
    }
}
