// src/dag/planner.rs

//! Level planning: group tasks into batches that can run in parallel.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::dag::DependencyGraph;
use crate::engine::TaskName;
use crate::errors::{Result, StagedagError};

/// Ordered sequence of levels; each level is a set of mutually independent
/// tasks.
///
/// Invariants (guaranteed by [`LevelPlan::plan`]):
/// - every task of the graph appears in exactly one level;
/// - a dependency's level index is strictly less than its dependent's;
/// - a task sits in the earliest level at which all its dependencies are
///   resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPlan {
    levels: Vec<BTreeSet<TaskName>>,
    level_index: HashMap<TaskName, usize>,
}

impl LevelPlan {
    /// Plan the graph with frontier-batched Kahn's algorithm.
    ///
    /// Fails with [`StagedagError::CyclicDependency`] (carrying every cycle)
    /// before any leveling is attempted if the graph is cyclic.
    pub fn plan(graph: &DependencyGraph) -> Result<Self> {
        if graph.has_cycles() {
            return Err(StagedagError::CyclicDependency {
                cycles: graph.detect_cycles().to_vec(),
            });
        }

        let mut unresolved: HashMap<&str, usize> =
            graph.tasks().map(|t| (t, graph.in_degree(t))).collect();

        let mut frontier: Vec<&str> = graph
            .tasks()
            .filter(|t| graph.in_degree(t) == 0)
            .collect();

        let mut levels: Vec<BTreeSet<TaskName>> = Vec::new();

        while !frontier.is_empty() {
            let mut next: Vec<&str> = Vec::new();

            for &v in &frontier {
                for (_, child) in graph.out_edges(v) {
                    if let Some(count) = unresolved.get_mut(child) {
                        *count -= 1;
                        if *count == 0 {
                            next.push(child);
                        }
                    }
                }
            }

            debug!(level = levels.len(), tasks = ?frontier, "planned level");
            levels.push(frontier.iter().map(|t| t.to_string()).collect());
            frontier = next;
        }

        let placed: usize = levels.iter().map(BTreeSet::len).sum();
        assert_eq!(
            placed,
            graph.len(),
            "level planner left tasks unplaced on a graph that passed the cycle check"
        );

        let level_index = levels
            .iter()
            .enumerate()
            .flat_map(|(i, level)| level.iter().map(move |t| (t.clone(), i)))
            .collect();

        Ok(Self {
            levels,
            level_index,
        })
    }

    pub fn levels(&self) -> &[BTreeSet<TaskName>] {
        &self.levels
    }

    /// Number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Index of the level that holds `task`.
    pub fn level_of(&self, task: &str) -> Option<usize> {
        self.level_index.get(task).copied()
    }

    pub fn task_count(&self) -> usize {
        self.level_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(names: &[&str]) -> BTreeSet<TaskName> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn chain_yields_one_task_per_level() {
        let g = DependencyGraph::build([
            ("c", vec!["b"]),
            ("b", vec!["a"]),
            ("a", vec![]),
        ])
        .unwrap();

        let plan = LevelPlan::plan(&g).unwrap();
        assert_eq!(plan.levels(), [set(&["a"]), set(&["b"]), set(&["c"])]);
        assert_eq!(plan.level_of("c"), Some(2));
    }

    #[test]
    fn task_waits_for_its_deepest_dependency() {
        // "late" depends on a root and on the end of a chain.
        let g = DependencyGraph::build([
            ("root", vec![]),
            ("mid", vec!["root"]),
            ("tail", vec!["mid"]),
            ("late", vec!["root", "tail"]),
            ("free", vec![]),
        ])
        .unwrap();

        let plan = LevelPlan::plan(&g).unwrap();
        assert_eq!(plan.level_of("free"), Some(0));
        assert_eq!(plan.level_of("late"), Some(3));
        assert_eq!(plan.task_count(), 5);
    }

    #[test]
    fn empty_graph_has_no_levels() {
        let g = DependencyGraph::build(Vec::<(&str, Vec<&str>)>::new()).unwrap();
        let plan = LevelPlan::plan(&g).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn cyclic_graph_is_refused() {
        let g = DependencyGraph::build([("a", vec!["b"]), ("b", vec!["a"])]).unwrap();
        match LevelPlan::plan(&g) {
            Err(StagedagError::CyclicDependency { cycles }) => {
                assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string()]]);
            }
            other => panic!("expected CyclicDependency, got {other:?}"),
        }
    }
}
