// src/config/model.rs

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{SchedulerOptions, TaskName};
use crate::types::{parse_duration, PersistMode};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// state_file = "state.yml"
/// max_parallel = 4
/// persist = "level"
///
/// [task.Test]
/// cmd = "cargo test"
///
/// [task.Coverage]
/// cmd = "cargo llvm-cov"
/// after = ["Test"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Run behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Where task state is kept between runs. Relative paths are resolved
    /// against the directory of the config file.
    #[serde(default = "default_state_file")]
    pub state_file: String,

    /// Upper bound on concurrently running tasks within a level.
    #[serde(default)]
    pub max_parallel: Option<usize>,

    /// `"end"` (default) or `"level"`.
    #[serde(default)]
    pub persist: PersistMode,

    /// Optional per-task time limit, e.g. `"30s"` or `"5m"`.
    #[serde(default)]
    pub task_timeout: Option<String>,
}

fn default_state_file() -> String {
    "state.yml".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            max_parallel: None,
            persist: PersistMode::default(),
            task_timeout: None,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Shell command to execute.
    pub cmd: String,

    /// Tasks that must have succeeded before this one runs.
    #[serde(default)]
    pub after: Vec<String>,
}

/// A validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`ConfigFile::new_unchecked`], so code holding one can rely on every
/// `after` entry naming a task and on the graph being acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    /// Build without validation. Meant for tests and for callers that have
    /// already validated the parts.
    pub fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }

    /// Task name -> dependencies, in task-name order.
    pub fn dependency_map(&self) -> Vec<(TaskName, Vec<TaskName>)> {
        self.task
            .iter()
            .map(|(name, task)| (name.clone(), task.after.clone()))
            .collect()
    }

    /// Task name -> shell command.
    pub fn commands(&self) -> HashMap<TaskName, String> {
        self.task
            .iter()
            .map(|(name, task)| (name.clone(), task.cmd.clone()))
            .collect()
    }

    /// Parsed `task_timeout`; `None` if unset or unparsable.
    pub fn task_timeout(&self) -> Option<Duration> {
        self.config
            .task_timeout
            .as_deref()
            .and_then(|s| parse_duration(s).ok())
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            max_parallel: self.config.max_parallel,
            persist_mode: self.config.persist,
            task_timeout: self.task_timeout(),
        }
    }
}
