#![allow(dead_code)]

use std::collections::BTreeMap;

use stagedag::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use stagedag::dag::DependencyGraph;
use stagedag::types::PersistMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_state_file(mut self, path: &str) -> Self {
        self.config.config.state_file = path.to_string();
        self
    }

    pub fn with_max_parallel(mut self, limit: usize) -> Self {
        self.config.config.max_parallel = Some(limit);
        self
    }

    pub fn with_persist(mut self, mode: PersistMode) -> Self {
        self.config.config.persist = mode;
        self
    }

    pub fn with_task_timeout(mut self, timeout: &str) -> Self {
        self.config.config.task_timeout = Some(timeout.to_string());
        self
    }

    /// The unvalidated config, for tests of validation itself.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                after: vec![],
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Build a graph from `(task, deps)` pairs, panicking on malformed input.
pub fn graph_from(spec: &[(&str, &[&str])]) -> DependencyGraph {
    DependencyGraph::build(spec.iter().map(|(name, deps)| (*name, deps.iter().copied())))
        .expect("Failed to build dependency graph")
}
