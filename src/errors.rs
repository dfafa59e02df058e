// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum StagedagError {
    #[error("Malformed graph: task '{task}' depends on unknown task '{dependency}'")]
    MalformedGraph { task: TaskName, dependency: TaskName },

    #[error("Duplicate task name: {0}")]
    DuplicateTask(TaskName),

    #[error("Cyclic dependency: {}", format_cycles(.cycles))]
    CyclicDependency { cycles: Vec<Vec<TaskName>> },

    #[error("No task body bound for task: {0}")]
    UnboundTask(TaskName),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskName),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Render cycles as `[a -> b -> a], [c -> c]`.
fn format_cycles(cycles: &[Vec<TaskName>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut names: Vec<&str> = cycle.iter().map(String::as_str).collect();
            if let Some(first) = cycle.first() {
                names.push(first.as_str());
            }
            format!("[{}]", names.join(" -> "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StagedagError>;
