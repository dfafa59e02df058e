// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The executor talks to an `ExecutorBackend` to turn a task name into a
//! unit of work. This keeps the scheduler independent of how task bodies are
//! defined:
//!
//! - [`DispatchTable`] binds each task name to an in-process closure.
//! - [`CommandBackend`](super::command::CommandBackend) runs a shell command
//!   per task in its own process.
//! - Tests can provide their own backend that records invocations.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Context};

use crate::engine::TaskName;

/// Future produced by invoking a task body. Any `Err` counts as a failure.
pub type TaskFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Trait abstracting how a named task is invoked.
pub trait ExecutorBackend: Send + Sync {
    /// Whether a unit of work is bound to `task`.
    fn has_task(&self, task: &str) -> bool;

    /// Start the unit of work bound to `task`.
    ///
    /// The returned future is spawned onto the runtime by the executor, so it
    /// must own everything it needs.
    fn invoke(&self, task: &str) -> TaskFuture;

    /// Whether dropping the future returned by [`invoke`](Self::invoke)
    /// stops the work. Bodies on the blocking pool run to completion
    /// regardless, so the executor waits for them after a timeout.
    fn is_abortable(&self, _task: &str) -> bool {
        true
    }
}

type TaskBody = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Explicit mapping from task name to task body.
///
/// ```no_run
/// use stagedag::exec::DispatchTable;
///
/// let table = DispatchTable::new()
///     .bind("fetch", || async { Ok(()) })
///     .bind_blocking("compress", || {
///         std::thread::sleep(std::time::Duration::from_millis(10));
///         Ok(())
///     });
/// assert!(table.contains("fetch"));
/// ```
#[derive(Clone, Default)]
pub struct DispatchTable {
    bodies: HashMap<TaskName, TaskBody>,
    blocking: HashSet<TaskName>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an async body to `name`, replacing any previous binding.
    pub fn bind<F, Fut>(mut self, name: impl Into<TaskName>, body: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.insert(name, body);
        self
    }

    /// Bind a blocking body to `name`; it runs on Tokio's blocking pool.
    pub fn bind_blocking<F>(mut self, name: impl Into<TaskName>, body: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let body = Arc::new(body);
        self.insert(name.clone(), move || {
            let body = Arc::clone(&body);
            async move {
                tokio::task::spawn_blocking(move || body())
                    .await
                    .context("blocking task body did not complete")?
            }
        });
        self.blocking.insert(name);
        self
    }

    pub fn insert<F, Fut>(&mut self, name: impl Into<TaskName>, body: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let body: TaskBody = Arc::new(move || Box::pin(body()) as TaskFuture);
        self.blocking.remove(&name);
        self.bodies.insert(name, body);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bodies.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bodies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        let mut blocking: Vec<&str> = self.blocking.iter().map(String::as_str).collect();
        blocking.sort_unstable();
        f.debug_struct("DispatchTable")
            .field("tasks", &names)
            .field("blocking", &blocking)
            .finish()
    }
}

impl ExecutorBackend for DispatchTable {
    fn has_task(&self, task: &str) -> bool {
        self.contains(task)
    }

    fn is_abortable(&self, task: &str) -> bool {
        !self.blocking.contains(task)
    }

    fn invoke(&self, task: &str) -> TaskFuture {
        match self.bodies.get(task) {
            Some(body) => body(),
            None => {
                let task = task.to_string();
                Box::pin(async move { Err(anyhow!("no task body bound for '{task}'")) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invokes_the_bound_body() {
        let table = DispatchTable::new()
            .bind("ok", || async { Ok(()) })
            .bind("bad", || async { Err(anyhow!("boom")) });

        assert!(table.invoke("ok").await.is_ok());
        let err = table.invoke("bad").await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn blocking_bodies_run_off_the_async_threads() {
        let table = DispatchTable::new().bind_blocking("sum", || {
            let total: u64 = (0..1_000u64).sum();
            anyhow::ensure!(total == 499_500, "wrong sum {total}");
            Ok(())
        });

        assert!(table.invoke("sum").await.is_ok());
        assert!(!table.is_abortable("sum"));
    }

    #[test]
    fn rebinding_as_async_makes_a_task_abortable() {
        let table = DispatchTable::new()
            .bind_blocking("job", || Ok(()))
            .bind("job", || async { Ok(()) });
        assert!(table.is_abortable("job"));
    }

    #[tokio::test]
    async fn unbound_name_fails_instead_of_panicking() {
        let table = DispatchTable::new();
        assert!(!table.has_task("ghost"));
        let err = table.invoke("ghost").await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
