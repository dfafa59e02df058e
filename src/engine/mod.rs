// src/engine/mod.rs

//! Orchestration engine for stagedag.
//!
//! This module ties together:
//! - the level plan computed from the dependency graph
//! - the state store loaded at the start of a run
//! - the task executor that runs each dispatched task
//! - the event sink that receives diagnostics
//!
//! The run loop itself lives in [`scheduler`]; [`events`] defines the
//! diagnostics it emits and [`report`] what a run returns.

use std::time::Duration;

use crate::types::PersistMode;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Knobs for a [`Scheduler`].
#[derive(Debug, Clone, Default)]
pub struct SchedulerOptions {
    /// Upper bound on tasks running at once inside a level. `None` runs the
    /// whole level at once.
    pub max_parallel: Option<usize>,
    /// When to write the state store back.
    pub persist_mode: PersistMode,
    /// Fail a task whose body runs longer than this. Off by default.
    pub task_timeout: Option<Duration>,
}

pub mod events;
pub mod report;
pub mod scheduler;

pub use events::{EventSink, SchedulerEvent, SkipReason, TracingSink};
pub use report::RunReport;
pub use scheduler::Scheduler;
