// src/exec/executor.rs

//! Runs one task and records its status transitions.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail};
use tokio::sync::Mutex;
use tracing::warn;

use crate::engine::{EventSink, SchedulerEvent};
use crate::exec::ExecutorBackend;
use crate::state::{StateStore, TaskStatus};

/// State store shared by the tasks of one level. Each task only touches
/// its own entry.
pub type SharedState = Arc<Mutex<StateStore>>;

/// Invokes task bodies through an [`ExecutorBackend`] and translates their
/// outcome into a status.
///
/// Failure isolation is per task: an error returned by the body, a panic
/// inside it, or the optional timeout elapsing all end as `Failed` and never
/// propagate to the caller.
#[derive(Clone)]
pub struct TaskExecutor {
    backend: Arc<dyn ExecutorBackend>,
    sink: Arc<dyn EventSink>,
    timeout: Option<Duration>,
}

impl TaskExecutor {
    pub fn new(backend: Arc<dyn ExecutorBackend>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            backend,
            sink,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `task` and return its terminal status.
    ///
    /// The caller must already have checked that the task's dependencies are
    /// satisfied. The entry for `task` is set to `Running` right before the
    /// body starts and to exactly one terminal status afterwards.
    pub async fn execute(&self, task: &str, state: &SharedState) -> TaskStatus {
        state.lock().await.set(task, TaskStatus::Running);
        self.sink.emit(SchedulerEvent::TaskStarted {
            task: task.to_string(),
        });

        let started = Instant::now();
        let outcome = self.invoke(task).await;
        let elapsed = started.elapsed();

        let status = match outcome {
            Ok(()) => {
                self.sink.emit(SchedulerEvent::TaskSucceeded {
                    task: task.to_string(),
                    elapsed,
                });
                TaskStatus::Succeeded
            }
            Err(err) => {
                self.sink.emit(SchedulerEvent::TaskFailed {
                    task: task.to_string(),
                    error: format!("{err:#}"),
                    elapsed,
                });
                TaskStatus::Failed
            }
        };

        debug_assert!(status.is_terminal());
        state.lock().await.set(task, status);
        status
    }

    /// Run the body on its own Tokio task so that a panic is contained.
    async fn invoke(&self, task: &str) -> anyhow::Result<()> {
        let mut handle = tokio::spawn(self.backend.invoke(task));

        let joined = match self.timeout {
            None => (&mut handle).await,
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    if self.backend.is_abortable(task) {
                        // Dropping the body future kills any child process it owns.
                        handle.abort();
                    } else {
                        warn!(
                            task = %task,
                            ?limit,
                            "task exceeded its timeout; waiting for its blocking body to return"
                        );
                    }
                    // No body may outlive its level.
                    let _ = handle.await;
                    bail!("task exceeded its timeout of {limit:?}");
                }
            },
        };

        match joined {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(anyhow!(
                "task body panicked: {}",
                panic_message(err.into_panic().as_ref())
            )),
            Err(err) => Err(anyhow!("task body was cancelled: {err}")),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TracingSink;
    use crate::exec::DispatchTable;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn executor(table: DispatchTable) -> TaskExecutor {
        TaskExecutor::new(Arc::new(table), Arc::new(TracingSink))
    }

    fn shared() -> SharedState {
        Arc::new(Mutex::new(StateStore::default()))
    }

    #[tokio::test]
    async fn success_marks_succeeded() {
        let state = shared();
        let exec = executor(DispatchTable::new().bind("a", || async { Ok(()) }));

        assert_eq!(exec.execute("a", &state).await, TaskStatus::Succeeded);
        assert_eq!(state.lock().await.status("a"), TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn status_is_running_while_the_body_runs() {
        let state = shared();
        let observed = Arc::clone(&state);
        let exec = executor(DispatchTable::new().bind("a", move || {
            let observed = Arc::clone(&observed);
            async move {
                let status = observed.lock().await.status("a");
                anyhow::ensure!(status == TaskStatus::Running, "saw {status}");
                Ok(())
            }
        }));

        assert_eq!(exec.execute("a", &state).await, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn panic_is_contained_as_failure() {
        let state = shared();
        let exec = executor(DispatchTable::new().bind("p", || async {
            let explode = true;
            if explode {
                panic!("kaboom");
            }
            Ok(())
        }));

        assert_eq!(exec.execute("p", &state).await, TaskStatus::Failed);
        assert_eq!(state.lock().await.status("p"), TaskStatus::Failed);
    }

    #[tokio::test]
    async fn timeout_fails_a_slow_task() {
        let state = shared();
        let exec = executor(DispatchTable::new().bind("slow", || async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }))
        .with_timeout(Some(Duration::from_millis(20)));

        assert_eq!(exec.execute("slow", &state).await, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn timed_out_blocking_body_is_awaited() {
        let state = shared();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        let exec = executor(DispatchTable::new().bind_blocking("grind", move || {
            std::thread::sleep(Duration::from_millis(150));
            flag.store(true, Ordering::SeqCst);
            Ok(())
        }))
        .with_timeout(Some(Duration::from_millis(20)));

        assert_eq!(exec.execute("grind", &state).await, TaskStatus::Failed);
        assert!(finished.load(Ordering::SeqCst));
        assert!(state.lock().await.status("grind").is_terminal());
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
    }
}
