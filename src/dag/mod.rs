// src/dag/mod.rs

//! Dependency graph and level planning.
//!
//! - [`graph`] holds the task set and declared dependency edges, and caches
//!   the simple cycles found at construction.
//! - [`cycles`] enumerates simple cycles over an index graph.
//! - [`planner`] turns an acyclic graph into an ordered list of levels
//!   (frontier-batched Kahn's algorithm).

pub mod cycles;
pub mod graph;
pub mod planner;

pub use graph::DependencyGraph;
pub use planner::LevelPlan;
