// src/exec/command.rs

//! Shell-command backend: every task runs as its own child process.

use std::collections::{HashMap, VecDeque};
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::engine::TaskName;
use crate::exec::backend::{ExecutorBackend, TaskFuture};

/// Lines of stderr kept to explain a failed command.
const STDERR_TAIL_LINES: usize = 20;

/// Runs the shell command bound to each task.
///
/// Stdout is inherited so task output reaches the terminal untouched; stderr
/// is logged at debug level and its last lines are attached to the failure
/// when the command exits unsuccessfully.
#[derive(Debug, Clone, Default)]
pub struct CommandBackend {
    commands: HashMap<TaskName, String>,
}

impl CommandBackend {
    pub fn new(commands: HashMap<TaskName, String>) -> Self {
        Self { commands }
    }

    /// One command per `[task.<name>]` section.
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(cfg.commands())
    }
}

impl ExecutorBackend for CommandBackend {
    fn has_task(&self, task: &str) -> bool {
        self.commands.contains_key(task)
    }

    fn invoke(&self, task: &str) -> TaskFuture {
        let task = task.to_string();
        let cmd = self.commands.get(&task).cloned();

        Box::pin(async move {
            let cmd = cmd.ok_or_else(|| anyhow!("no command bound for task '{task}'"))?;
            run_command(&task, &cmd).await
        })
    }
}

/// Run `cmd` through the platform shell and fail on a non-zero exit.
async fn run_command(task: &str, cmd: &str) -> Result<()> {
    info!(task = %task, cmd = %cmd, "starting task process");

    // Build a shell command appropriate for the platform.
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task))?;

    let stderr_tail = match child.stderr.take() {
        Some(stderr) => {
            let task_name = task.to_string();
            Some(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %task_name, "stderr: {}", line);
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }

                tail
            }))
        }
        None => None,
    };

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of task '{}'", task))?;

    let tail = match stderr_tail {
        Some(handle) => handle.await.unwrap_or_default(),
        None => VecDeque::new(),
    };

    let code = status.code().unwrap_or(-1);
    info!(
        task = %task,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    if !status.success() {
        let detail = Vec::from(tail).join("\n");
        if detail.is_empty() {
            bail!("command `{cmd}` exited with code {code}");
        }
        bail!("command `{cmd}` exited with code {code}: {detail}");
    }

    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn backend() -> CommandBackend {
        CommandBackend::new(HashMap::from([
            ("ok".to_string(), "true".to_string()),
            ("bad".to_string(), "echo broken pipe >&2; exit 3".to_string()),
        ]))
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        assert!(backend().invoke("ok").await.is_ok());
    }

    #[tokio::test]
    async fn non_zero_exit_carries_code_and_stderr() {
        let err = backend().invoke("bad").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("exited with code 3"), "got: {msg}");
        assert!(msg.contains("broken pipe"), "got: {msg}");
    }

    #[tokio::test]
    async fn unknown_task_is_a_failure() {
        let b = backend();
        assert!(!b.has_task("ghost"));
        assert!(b.invoke("ghost").await.is_err());
    }
}
