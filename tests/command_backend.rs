// tests/command_backend.rs
#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::sync::Arc;

use stagedag::config::load_and_validate;
use stagedag::dag::DependencyGraph;
use stagedag::engine::Scheduler;
use stagedag::exec::CommandBackend;
use stagedag::state::{TaskStatus, YamlStateFile};
use stagedag_test_utils::{init_tracing, with_timeout};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn shell_commands_run_in_dependency_order() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let log = dir.path().join("order.log");
    let config = dir.path().join("Stagedag.toml");
    fs::write(
        &config,
        format!(
            r#"
            [task.first]
            cmd = "echo first >> {log}"

            [task.second]
            cmd = "echo second >> {log}"
            after = ["first"]

            [task.broken]
            cmd = "echo nope >&2; exit 7"

            [task.never]
            cmd = "echo never >> {log}"
            after = ["broken"]
            "#,
            log = log.display()
        ),
    )?;

    let cfg = load_and_validate(&config)?;
    let state_path = dir.path().join("state.yml");
    let scheduler = Scheduler::new(
        DependencyGraph::build(cfg.dependency_map())?,
        Arc::new(CommandBackend::from_config(&cfg)),
        Arc::new(YamlStateFile::new(&state_path)),
        cfg.scheduler_options(),
    )?;

    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(fs::read_to_string(&log)?, "first\nsecond\n");
    assert_eq!(report.failed, vec!["broken"]);
    assert_eq!(report.blocked, vec!["never"]);
    assert_eq!(report.final_state.status("second"), TaskStatus::Succeeded);

    let persisted = fs::read_to_string(&state_path)?;
    assert!(persisted.contains("broken: FAILED"), "got: {persisted}");
    assert!(persisted.contains("never: null"), "got: {persisted}");
    Ok(())
}

#[tokio::test]
async fn timed_out_command_is_failed() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let config = dir.path().join("Stagedag.toml");
    fs::write(
        &config,
        r#"
        [config]
        task_timeout = "100ms"

        [task.sleepy]
        cmd = "sleep 10"
        "#,
    )?;

    let cfg = load_and_validate(&config)?;
    let scheduler = Scheduler::new(
        DependencyGraph::build(cfg.dependency_map())?,
        Arc::new(CommandBackend::from_config(&cfg)),
        Arc::new(YamlStateFile::new(dir.path().join("state.yml"))),
        cfg.scheduler_options(),
    )?;

    let report = with_timeout(scheduler.run()).await?;

    assert_eq!(report.failed, vec!["sleepy"]);
    Ok(())
}
