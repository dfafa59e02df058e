// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stagedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stagedag",
    version,
    about = "Run a dependency graph of tasks level by level, skipping what already succeeded.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Stagedag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Stagedag.toml")]
    pub config: String,

    /// Override `[config].state_file`.
    #[arg(long, value_name = "PATH")]
    pub state: Option<String>,

    /// Run only this task (if its dependencies have succeeded).
    #[arg(long, value_name = "NAME")]
    pub task: Option<String>,

    /// Override `[config].max_parallel`.
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAGEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Also append logs (without colours) to this file.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Parse + validate, print the level plan and current state, but don't
    /// execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["stagedag"]);
        assert_eq!(args.config, "Stagedag.toml");
        assert!(args.task.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn overrides() {
        let args = CliArgs::parse_from([
            "stagedag",
            "--config",
            "ci/Stagedag.toml",
            "--state",
            "/tmp/state.yml",
            "--task",
            "Lint",
            "--max-parallel",
            "2",
            "--log-level",
            "debug",
            "--log-file",
            "logs/stagedag.log",
            "--dry-run",
        ]);
        assert_eq!(args.state.as_deref(), Some("/tmp/state.yml"));
        assert_eq!(args.task.as_deref(), Some("Lint"));
        assert_eq!(args.max_parallel, Some(2));
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert_eq!(args.log_file, Some(PathBuf::from("logs/stagedag.log")));
        assert!(args.dry_run);
    }
}
