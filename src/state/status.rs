// src/state/status.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task across runs.
///
/// Within one attempt a task moves `Unknown/Failed -> Running -> {Succeeded,
/// Failed}`. Nothing is retried automatically; the next run re-attempts
/// every task that is not exactly `Succeeded`.
///
/// Serialized literals match the persisted state file: `RUNNING`, `SUCCESS`,
/// `FAILED`. `Unknown` is written as `null` by the state store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    #[default]
    Unknown,
    Running,
    #[serde(rename = "SUCCESS", alias = "SUCCEEDED")]
    Succeeded,
    Failed,
}

impl TaskStatus {
    /// `Succeeded` or `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Unknown => "unknown",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
