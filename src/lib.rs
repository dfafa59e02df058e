// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod state;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::DependencyGraph;
use crate::engine::{RunReport, Scheduler};
use crate::exec::CommandBackend;
use crate::state::YamlStateFile;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - dependency graph + level plan
/// - the YAML state file
/// - the shell-command backend
///
/// Returns an error when any task failed or was held back by a failed
/// dependency, so the process exits non-zero.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    let graph = DependencyGraph::build(cfg.dependency_map())?;

    let mut options = cfg.scheduler_options();
    if let Some(limit) = args.max_parallel {
        options.max_parallel = Some(limit);
    }

    let state_path = match args.state.as_deref() {
        Some(path) => PathBuf::from(path),
        None => resolve_state_path(&config_path, &cfg.config.state_file),
    };
    debug!(path = %state_path.display(), "using state file");

    let scheduler = Scheduler::new(
        graph,
        Arc::new(CommandBackend::from_config(&cfg)),
        Arc::new(YamlStateFile::new(&state_path)),
        options,
    )?;

    if args.dry_run {
        print_dry_run(&cfg, &scheduler, &state_path)?;
        return Ok(());
    }

    let report = match args.task.as_deref() {
        Some(task) => scheduler.run_task(task).await?,
        None => scheduler.run().await?,
    };

    summarize(&report)
}

fn summarize(report: &RunReport) -> Result<()> {
    info!(
        invoked = report.invoked.len(),
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        already_succeeded = report.already_succeeded.len(),
        blocked = report.blocked.len(),
        "run summary"
    );

    if !report.is_success() {
        bail!(
            "{} task(s) failed {:?}, {} task(s) blocked by dependencies {:?}",
            report.failed.len(),
            report.failed,
            report.blocked.len(),
            report.blocked
        );
    }

    Ok(())
}

/// Directory relative paths in the config are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "ci/Stagedag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Stagedag.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Resolve `[config].state_file` relative to the config file.
pub fn resolve_state_path(config_path: &Path, state_file: &str) -> PathBuf {
    let state_file = Path::new(state_file);
    if state_file.is_absolute() {
        state_file.to_path_buf()
    } else {
        config_root_dir(config_path).join(state_file)
    }
}

/// Print levels, commands and the state the next run would start from.
fn print_dry_run(cfg: &ConfigFile, scheduler: &Scheduler, state_path: &Path) -> Result<()> {
    let state = scheduler.load_state()?;
    let options = scheduler.options();

    println!("stagedag dry-run");
    println!("  state_file = {}", state_path.display());
    println!("  persist = {:?}", options.persist_mode);
    match options.max_parallel {
        Some(limit) => println!("  max_parallel = {limit}"),
        None => println!("  max_parallel = unbounded"),
    }
    if let Some(timeout) = options.task_timeout {
        println!("  task_timeout = {timeout:?}");
    }
    println!();

    println!(
        "levels ({}), tasks ({}):",
        scheduler.plan().len(),
        scheduler.plan().task_count()
    );
    for (index, level) in scheduler.plan().levels().iter().enumerate() {
        println!("  level {index}:");
        for name in level {
            println!("    - {name} [{}]", state.status(name));
            if let Some(task) = cfg.task.get(name) {
                println!("        cmd: {}", task.cmd);
                if !task.after.is_empty() {
                    println!("        after: {:?}", task.after);
                }
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
