// src/dag/graph.rs

use std::collections::HashMap;

use crate::dag::cycles::simple_cycles;
use crate::engine::TaskName;
use crate::errors::{Result, StagedagError};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    name: TaskName,
    /// Direct dependencies: tasks that must finish before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskName>,
}

/// In-memory dependency graph keyed by task name.
///
/// Edges point from a dependency to its dependent ("dependent cannot start
/// before dependency finishes"). Node order follows the order in which the
/// dependency map was supplied.
///
/// Cycle detection runs once in [`DependencyGraph::build`] and the result is
/// cached; a graph can be built from cyclic input, but it cannot be planned.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<DagNode>,
    index: HashMap<TaskName, usize>,
    cycles: Vec<Vec<TaskName>>,
}

impl DependencyGraph {
    /// Build a graph from a dependency map (`task -> [dependencies]`).
    ///
    /// Fails with [`StagedagError::DuplicateTask`] if a task name appears
    /// twice, and with [`StagedagError::MalformedGraph`] if a dependency is
    /// not itself a task. Repeated entries inside one dependency list are
    /// collapsed into a single edge.
    pub fn build<I, K, D, S>(dependencies: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<TaskName>,
        D: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        let mut nodes: Vec<DagNode> = Vec::new();
        let mut index: HashMap<TaskName, usize> = HashMap::new();

        // First pass: create nodes with their dependency lists.
        for (name, deps) in dependencies {
            let name: TaskName = name.into();
            if index.contains_key(&name) {
                return Err(StagedagError::DuplicateTask(name));
            }

            let mut unique: Vec<TaskName> = Vec::new();
            for dep in deps {
                let dep: TaskName = dep.into();
                if !unique.contains(&dep) {
                    unique.push(dep);
                }
            }

            index.insert(name.clone(), nodes.len());
            nodes.push(DagNode {
                name,
                deps: unique,
                dependents: Vec::new(),
            });
        }

        // Second pass: check references and populate dependents.
        for i in 0..nodes.len() {
            let task_name = nodes[i].name.clone();
            let deps = nodes[i].deps.clone();

            for dep in deps {
                let Some(&j) = index.get(&dep) else {
                    return Err(StagedagError::MalformedGraph {
                        task: task_name,
                        dependency: dep,
                    });
                };
                nodes[j].dependents.push(task_name.clone());
            }
        }

        // Cycles are enumerated in the "depends-on" direction, so that each
        // consecutive pair reads "x depends on y".
        let adjacency: Vec<Vec<usize>> = nodes
            .iter()
            .map(|node| node.deps.iter().map(|dep| index[dep]).collect())
            .collect();
        let cycles = simple_cycles(&adjacency)
            .into_iter()
            .map(|cycle| cycle.into_iter().map(|i| nodes[i].name.clone()).collect())
            .collect();

        Ok(Self {
            nodes,
            index,
            cycles,
        })
    }

    /// All simple cycles found at construction. Empty means acyclic.
    pub fn detect_cycles(&self) -> &[Vec<TaskName>] {
        &self.cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Return all task names, in the order they were supplied.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.node(name).map(|n| n.deps.as_slice()).unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one as a dependency).
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.node(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Edges ending at `name`, as `(dependency, name)` pairs.
    pub fn in_edges<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.dependencies_of(name)
            .iter()
            .map(move |dep| (dep.as_str(), name))
    }

    /// Edges starting at `name`, as `(name, dependent)` pairs.
    pub fn out_edges<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.dependents_of(name)
            .iter()
            .map(move |dependent| (name, dependent.as_str()))
    }

    /// Number of unresolved dependencies a task starts with.
    pub fn in_degree(&self, name: &str) -> usize {
        self.dependencies_of(name).len()
    }

    /// Number of tasks that depend on `name`.
    pub fn out_degree(&self, name: &str) -> usize {
        self.dependents_of(name).len()
    }

    fn node(&self, name: &str) -> Option<&DagNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }
}
