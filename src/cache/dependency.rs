//! Dependency Graph Module
//!
//! Static relationships between a dataset and the derived datasets that must
//! be invalidated along with it.

use std::collections::{BTreeMap, BTreeSet};

use crate::cache::Dataset;
use crate::error::{CacheError, Result};

// == Dependency Graph ==
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<Dataset, BTreeSet<Dataset>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `dependents` are derived from `dataset`.
    pub fn with_dependents(
        mut self,
        dataset: Dataset,
        dependents: impl IntoIterator<Item = Dataset>,
    ) -> Self {
        self.edges.entry(dataset).or_default().extend(dependents);
        self
    }

    /// Direct dependents of a dataset, in a stable order.
    pub fn dependents(&self, dataset: Dataset) -> impl Iterator<Item = Dataset> + '_ {
        self.edges.get(&dataset).into_iter().flatten().copied()
    }

    /// Rejects graphs containing a cycle, including self-edges.
    pub fn validate(&self) -> Result<()> {
        let mut marks: BTreeMap<Dataset, Mark> = BTreeMap::new();
        for &start in self.edges.keys() {
            self.visit(start, &mut marks)?;
        }
        Ok(())
    }

    fn visit(&self, node: Dataset, marks: &mut BTreeMap<Dataset, Mark>) -> Result<()> {
        match marks.get(&node) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return Err(CacheError::InvalidConfig(format!(
                    "Dependency cycle through dataset '{}'",
                    node
                )))
            }
            None => {}
        }

        marks.insert(node, Mark::Visiting);
        for next in self.dependents(node) {
            self.visit(next, marks)?;
        }
        marks.insert(node, Mark::Done);
        Ok(())
    }

    /// Calendar views derive from events, analytics from campaigns.
    pub fn standard() -> Self {
        Self::new()
            .with_dependents(
                Dataset::Events,
                [
                    Dataset::MonthView,
                    Dataset::WeekView,
                    Dataset::DayView,
                    Dataset::ListView,
                ],
            )
            .with_dependents(Dataset::Campaigns, [Dataset::Analytics])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_graph_is_acyclic() {
        let graph = DependencyGraph::standard();
        graph.validate().unwrap();

        let deps: Vec<_> = graph.dependents(Dataset::Events).collect();
        assert_eq!(
            deps,
            vec![
                Dataset::MonthView,
                Dataset::WeekView,
                Dataset::DayView,
                Dataset::ListView
            ]
        );
        assert_eq!(graph.dependents(Dataset::Templates).count(), 0);
    }

    #[test]
    fn test_cycle_rejected() {
        let graph = DependencyGraph::new()
            .with_dependents(Dataset::Events, [Dataset::MonthView])
            .with_dependents(Dataset::MonthView, [Dataset::Events]);

        assert!(matches!(graph.validate(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_self_edge_rejected() {
        let graph =
            DependencyGraph::new().with_dependents(Dataset::Analytics, [Dataset::Analytics]);
        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let graph = DependencyGraph::new()
            .with_dependents(Dataset::Events, [Dataset::MonthView, Dataset::WeekView])
            .with_dependents(Dataset::MonthView, [Dataset::ListView])
            .with_dependents(Dataset::WeekView, [Dataset::ListView]);

        graph.validate().unwrap();
    }
}
