// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::DependencyGraph;
use crate::errors::{Result, StagedagError};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = StagedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_tasks(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(StagedagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.max_parallel == Some(0) {
        return Err(StagedagError::ConfigError(
            "[config].max_parallel must be >= 1 (got 0)".to_string(),
        ));
    }

    if let Some(timeout) = cfg.config.task_timeout.as_deref() {
        parse_duration(timeout).map_err(|e| {
            StagedagError::ConfigError(format!("[config].task_timeout: {e}"))
        })?;
    }

    if cfg.config.state_file.trim().is_empty() {
        return Err(StagedagError::ConfigError(
            "[config].state_file must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(StagedagError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                name
            )));
        }
        for dep in task.after.iter() {
            if !cfg.task.contains_key(dep) {
                return Err(StagedagError::ConfigError(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

/// Self-dependencies are reported as one-task cycles here.
fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    let graph = DependencyGraph::build(
        cfg.task
            .iter()
            .map(|(name, task)| (name.as_str(), task.after.iter().map(String::as_str))),
    )?;

    if graph.has_cycles() {
        return Err(StagedagError::CyclicDependency {
            cycles: graph.detect_cycles().to_vec(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::loader::load_from_str;
    use crate::config::ConfigFile;
    use crate::errors::StagedagError;

    fn validate(toml: &str) -> Result<ConfigFile, StagedagError> {
        ConfigFile::try_from(load_from_str(toml)?)
    }

    #[test]
    fn empty_config_is_rejected() {
        let err = validate("").unwrap_err();
        assert!(err.to_string().contains("at least one [task.<name>]"));
    }

    #[test]
    fn unknown_dependency_is_named() {
        let err = validate(
            r#"
            [task.A]
            cmd = "true"
            after = ["B"]
            "#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: task 'A' has unknown dependency 'B' in `after`"
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = validate(
            r#"
            [task.A]
            cmd = "true"
            after = ["A"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, StagedagError::CyclicDependency { .. }));
    }

    #[test]
    fn bad_timeout_and_zero_parallelism_are_rejected() {
        let err = validate(
            r#"
            [config]
            task_timeout = "soon"
            [task.A]
            cmd = "true"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("task_timeout"));

        let err = validate(
            r#"
            [config]
            max_parallel = 0
            [task.A]
            cmd = "true"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_parallel"));
    }

    #[test]
    fn defaults_apply() {
        let cfg = validate(
            r#"
            [task.A]
            cmd = "true"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.config.state_file, "state.yml");
        assert_eq!(cfg.config.max_parallel, None);
        assert_eq!(cfg.task_timeout(), None);
    }
}
