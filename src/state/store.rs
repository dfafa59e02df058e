// src/state/store.rs

//! The state store: task name -> [`TaskStatus`] for every task in the graph.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::dag::DependencyGraph;
use crate::engine::TaskName;
use crate::errors::Result;
use crate::state::persist::{PersistedState, StatePersistence};
use crate::state::status::TaskStatus;

/// Mapping from task name to its lifecycle status.
///
/// Loaded at the start of a run, mutated as tasks transition and written back
/// in full afterwards. Lookups of names that are not present report
/// [`TaskStatus::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateStore {
    statuses: BTreeMap<TaskName, TaskStatus>,
}

impl StateStore {
    /// A fresh store with every graph task at `Unknown`.
    pub fn unknown_for(graph: &DependencyGraph) -> Self {
        Self {
            statuses: graph
                .tasks()
                .map(|t| (t.to_string(), TaskStatus::Unknown))
                .collect(),
        }
    }

    /// Build a store for `graph` from persisted content.
    ///
    /// Graph tasks missing from `persisted` (or persisted as `null`) start at
    /// `Unknown`; persisted names that are not in the graph are dropped.
    pub fn from_persisted(persisted: PersistedState, graph: &DependencyGraph) -> Self {
        let mut store = Self::unknown_for(graph);

        for (name, status) in persisted {
            match store.statuses.get_mut(&name) {
                Some(slot) => *slot = status.unwrap_or_default(),
                None => {
                    warn!(task = %name, "persisted state names a task not in the graph; dropping it");
                }
            }
        }

        store
    }

    /// Load state through `persistence`.
    ///
    /// A missing persisted resource is the normal first-run case and yields
    /// an all-`Unknown` store.
    pub fn load(persistence: &dyn StatePersistence, graph: &DependencyGraph) -> Result<Self> {
        match persistence.load()? {
            Some(persisted) => {
                debug!(entries = persisted.len(), "loaded persisted task state");
                Ok(Self::from_persisted(persisted, graph))
            }
            None => {
                debug!("no persisted task state; every task starts as unknown");
                Ok(Self::unknown_for(graph))
            }
        }
    }

    /// Persist the full store, replacing whatever was stored before.
    pub fn save(&self, persistence: &dyn StatePersistence) -> Result<()> {
        persistence.save(&self.to_persisted())
    }

    /// Persisted form: `Unknown` becomes `None` (written as `null`).
    pub fn to_persisted(&self) -> PersistedState {
        self.statuses
            .iter()
            .map(|(name, status)| {
                let value = match status {
                    TaskStatus::Unknown => None,
                    other => Some(*other),
                };
                (name.clone(), value)
            })
            .collect()
    }

    pub fn status(&self, task: &str) -> TaskStatus {
        self.statuses.get(task).copied().unwrap_or_default()
    }

    /// Set the status of `task`, returning the previous one.
    pub fn set(&mut self, task: &str, status: TaskStatus) -> TaskStatus {
        self.statuses
            .insert(task.to_string(), status)
            .unwrap_or_default()
    }

    /// True iff every dependency is exactly `Succeeded`.
    ///
    /// `Unknown`, `Failed` and `Running` all count as unsatisfied.
    pub fn is_satisfied<S: AsRef<str>>(&self, dependencies: &[S]) -> bool {
        dependencies
            .iter()
            .all(|dep| self.status(dep.as_ref()) == TaskStatus::Succeeded)
    }

    /// Dependencies that keep a task from running.
    pub fn unsatisfied<S: AsRef<str>>(&self, dependencies: &[S]) -> Vec<TaskName> {
        dependencies
            .iter()
            .filter(|dep| self.status(dep.as_ref()) != TaskStatus::Succeeded)
            .map(|dep| dep.as_ref().to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, TaskStatus)> {
        self.statuses.iter().map(|(name, status)| (name.as_str(), *status))
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Number of tasks currently in `status`.
    pub fn count(&self, status: TaskStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }
}

impl<K: Into<TaskName>> FromIterator<(K, TaskStatus)> for StateStore {
    fn from_iter<I: IntoIterator<Item = (K, TaskStatus)>>(iter: I) -> Self {
        Self {
            statuses: iter.into_iter().map(|(k, s)| (k.into(), s)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> DependencyGraph {
        DependencyGraph::build([("a", vec![]), ("b", vec!["a"]), ("c", vec!["a", "b"])]).unwrap()
    }

    #[test]
    fn only_succeeded_dependencies_satisfy() {
        let mut store = StateStore::unknown_for(&graph());
        let deps = ["a", "b"];

        assert!(!store.is_satisfied(&deps));

        store.set("a", TaskStatus::Succeeded);
        store.set("b", TaskStatus::Running);
        assert!(!store.is_satisfied(&deps));
        assert_eq!(store.unsatisfied(&deps), vec!["b".to_string()]);

        store.set("b", TaskStatus::Failed);
        assert!(!store.is_satisfied(&deps));

        store.set("b", TaskStatus::Succeeded);
        assert!(store.is_satisfied(&deps));
        assert!(store.unsatisfied(&deps).is_empty());
    }

    #[test]
    fn no_dependencies_is_always_satisfied() {
        let store = StateStore::default();
        assert!(store.is_satisfied::<&str>(&[]));
    }

    #[test]
    fn persisted_entries_outside_the_graph_are_dropped() {
        let persisted: PersistedState = [
            ("a".to_string(), Some(TaskStatus::Succeeded)),
            ("b".to_string(), None),
            ("gone".to_string(), Some(TaskStatus::Failed)),
        ]
        .into_iter()
        .collect();

        let store = StateStore::from_persisted(persisted, &graph());

        assert_eq!(store.len(), 3);
        assert_eq!(store.status("a"), TaskStatus::Succeeded);
        assert_eq!(store.status("b"), TaskStatus::Unknown);
        assert_eq!(store.status("c"), TaskStatus::Unknown);
        assert_eq!(store.status("gone"), TaskStatus::Unknown);
    }

    #[test]
    fn unknown_is_persisted_as_none() {
        let store: StateStore = [("a", TaskStatus::Unknown), ("b", TaskStatus::Failed)]
            .into_iter()
            .collect();

        let persisted = store.to_persisted();
        assert_eq!(persisted["a"], None);
        assert_eq!(persisted["b"], Some(TaskStatus::Failed));
    }
}
