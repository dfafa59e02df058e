// src/engine/events.rs

//! Diagnostic events produced during a run, and the sink they are sent to.
//!
//! The scheduler reports progress by handing [`SchedulerEvent`]s to the
//! [`EventSink`] it was constructed with. [`TracingSink`] forwards them to
//! `tracing`, tests install a recording sink instead.

use std::time::Duration;

use tracing::{debug, error, info};

use crate::engine::TaskName;

/// Why a task in the current level was not dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The task succeeded in an earlier run.
    AlreadySucceeded,
    /// At least one dependency is not `Succeeded`.
    DependenciesUnsatisfied { blocking: Vec<TaskName> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    RunStarted {
        tasks: usize,
        levels: usize,
    },
    LevelStarted {
        level: usize,
        tasks: Vec<TaskName>,
    },
    TaskStarted {
        task: TaskName,
    },
    TaskSkipped {
        task: TaskName,
        reason: SkipReason,
    },
    TaskSucceeded {
        task: TaskName,
        elapsed: Duration,
    },
    /// `error` carries the full error chain of the failure.
    TaskFailed {
        task: TaskName,
        error: String,
        elapsed: Duration,
    },
    LevelCompleted {
        level: usize,
        dispatched: usize,
        skipped: usize,
    },
    StatePersisted {
        tasks: usize,
    },
    RunCompleted {
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Receiver of scheduler diagnostics.
///
/// Called from concurrently running tasks; implementations must not block
/// for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SchedulerEvent);
}

/// Default sink: turns every event into a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::RunStarted { tasks, levels } => {
                info!(tasks, levels, "run started");
            }
            SchedulerEvent::LevelStarted { level, tasks } => {
                debug!(level, ?tasks, "level started");
            }
            SchedulerEvent::TaskStarted { task } => {
                info!(task = %task, "running task");
            }
            SchedulerEvent::TaskSkipped {
                task,
                reason: SkipReason::AlreadySucceeded,
            } => {
                debug!(task = %task, "task already completed; skipping");
            }
            SchedulerEvent::TaskSkipped {
                task,
                reason: SkipReason::DependenciesUnsatisfied { blocking },
            } => {
                info!(task = %task, ?blocking, "dependencies not satisfied; skipping");
            }
            SchedulerEvent::TaskSucceeded { task, elapsed } => {
                info!(task = %task, ?elapsed, "task completed successfully");
            }
            SchedulerEvent::TaskFailed {
                task,
                error,
                elapsed,
            } => {
                error!(task = %task, ?elapsed, error = %error, "task failed");
            }
            SchedulerEvent::LevelCompleted {
                level,
                dispatched,
                skipped,
            } => {
                info!(level, dispatched, skipped, "level complete");
            }
            SchedulerEvent::StatePersisted { tasks } => {
                debug!(tasks, "task state persisted");
            }
            SchedulerEvent::RunCompleted {
                succeeded,
                failed,
                skipped,
            } => {
                info!(succeeded, failed, skipped, "run complete");
            }
        }
    }
}
