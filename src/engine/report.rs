// src/engine/report.rs

use crate::engine::TaskName;
use crate::state::{StateStore, TaskStatus};

/// Outcome of a single run.
///
/// Task lists are sorted by name; they do not reflect completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks whose body was invoked during this run.
    pub invoked: Vec<TaskName>,
    pub succeeded: Vec<TaskName>,
    pub failed: Vec<TaskName>,
    /// Not dispatched because they had succeeded in an earlier run.
    pub already_succeeded: Vec<TaskName>,
    /// Not dispatched because a dependency was not `Succeeded`.
    pub blocked: Vec<TaskName>,
    /// State as it was persisted at the end of the run.
    pub final_state: StateStore,
}

impl RunReport {
    pub(crate) fn record_outcome(&mut self, task: TaskName, status: TaskStatus) {
        match status {
            TaskStatus::Succeeded => self.succeeded.push(task.clone()),
            _ => self.failed.push(task.clone()),
        }
        self.invoked.push(task);
    }

    pub(crate) fn record_already_succeeded(&mut self, task: TaskName) {
        self.already_succeeded.push(task);
    }

    pub(crate) fn record_blocked(&mut self, task: TaskName) {
        self.blocked.push(task);
    }

    pub(crate) fn finish(&mut self, final_state: StateStore) {
        self.invoked.sort();
        self.succeeded.sort();
        self.failed.sort();
        self.already_succeeded.sort();
        self.blocked.sort();
        self.final_state = final_state;
    }

    /// No task failed and none was held back by a dependency.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.blocked.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.already_succeeded.len() + self.blocked.len()
    }
}
