// src/engine/scheduler.rs

//! The run loop: load state, execute the plan level by level, persist.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::dag::{DependencyGraph, LevelPlan};
use crate::engine::events::{EventSink, SchedulerEvent, SkipReason, TracingSink};
use crate::engine::report::RunReport;
use crate::engine::{SchedulerOptions, TaskName};
use crate::errors::{Result, StagedagError};
use crate::exec::{ExecutorBackend, SharedState, TaskExecutor};
use crate::state::{StatePersistence, StateStore, TaskStatus};
use crate::types::PersistMode;

/// Runs a dependency graph against a backend, one level at a time.
///
/// A `Scheduler` is built once per graph and can be run repeatedly; every
/// run starts by loading persisted state, so tasks that already succeeded
/// are not invoked again.
pub struct Scheduler {
    graph: DependencyGraph,
    plan: LevelPlan,
    backend: Arc<dyn ExecutorBackend>,
    executor: TaskExecutor,
    persistence: Arc<dyn StatePersistence>,
    sink: Arc<dyn EventSink>,
    options: SchedulerOptions,
}

impl Scheduler {
    /// Validate `graph` against `backend` and compute the level plan.
    ///
    /// Fails with `CyclicDependency` if the graph has a cycle and with
    /// `UnboundTask` if a task has no body in `backend`. Nothing is executed
    /// or loaded here.
    pub fn new(
        graph: DependencyGraph,
        backend: Arc<dyn ExecutorBackend>,
        persistence: Arc<dyn StatePersistence>,
        options: SchedulerOptions,
    ) -> Result<Self> {
        let plan = LevelPlan::plan(&graph)?;

        if let Some(task) = graph.tasks().find(|t| !backend.has_task(t)) {
            return Err(StagedagError::UnboundTask(task.to_string()));
        }

        if options.max_parallel == Some(0) {
            return Err(StagedagError::ConfigError(
                "max_parallel must be >= 1 (got 0)".to_string(),
            ));
        }

        let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
        let executor = TaskExecutor::new(Arc::clone(&backend), Arc::clone(&sink))
            .with_timeout(options.task_timeout);

        debug!(
            tasks = graph.len(),
            levels = plan.len(),
            ?options,
            "scheduler constructed"
        );

        Ok(Self {
            graph,
            plan,
            backend,
            executor,
            persistence,
            sink,
            options,
        })
    }

    /// Replace the default [`TracingSink`].
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.executor = TaskExecutor::new(Arc::clone(&self.backend), Arc::clone(&sink))
            .with_timeout(self.options.task_timeout);
        self.sink = sink;
        self
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn plan(&self) -> &LevelPlan {
        &self.plan
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// State as the next run would see it.
    pub fn load_state(&self) -> Result<StateStore> {
        StateStore::load(self.persistence.as_ref(), &self.graph)
    }

    /// Execute every level in order and persist the resulting state.
    ///
    /// Task failures never make this return an error; they are recorded in
    /// the report and their dependents are skipped. Errors are limited to
    /// loading and saving state.
    pub async fn run(&self) -> Result<RunReport> {
        let state: SharedState = Arc::new(Mutex::new(self.load_state()?));
        let limiter = self
            .options
            .max_parallel
            .map(|permits| Arc::new(Semaphore::new(permits)));
        let mut report = RunReport::default();

        self.sink.emit(SchedulerEvent::RunStarted {
            tasks: self.graph.len(),
            levels: self.plan.len(),
        });

        for (index, level) in self.plan.levels().iter().enumerate() {
            self.sink.emit(SchedulerEvent::LevelStarted {
                level: index,
                tasks: level.iter().cloned().collect(),
            });

            let runnable = self
                .triage(level.iter().map(String::as_str), &state, &mut report)
                .await;
            let dispatched = runnable.len();

            self.run_level(runnable, &state, limiter.as_ref(), &mut report)
                .await;

            self.sink.emit(SchedulerEvent::LevelCompleted {
                level: index,
                dispatched,
                skipped: level.len() - dispatched,
            });

            if self.options.persist_mode == PersistMode::Level {
                let snapshot = state.lock().await.clone();
                match snapshot.save(self.persistence.as_ref()) {
                    Ok(()) => self.sink.emit(SchedulerEvent::StatePersisted {
                        tasks: snapshot.len(),
                    }),
                    Err(err) => {
                        warn!(level = index, error = %err, "failed to persist state after level");
                    }
                }
            }
        }

        self.finish(state, report).await
    }

    /// Run exactly one task, if it has not already succeeded and its
    /// dependencies are satisfied, then persist.
    pub async fn run_task(&self, task: &str) -> Result<RunReport> {
        if !self.graph.contains(task) {
            return Err(StagedagError::TaskNotFound(task.to_string()));
        }

        let state: SharedState = Arc::new(Mutex::new(self.load_state()?));
        let mut report = RunReport::default();

        self.sink
            .emit(SchedulerEvent::RunStarted { tasks: 1, levels: 1 });

        for name in self.triage([task], &state, &mut report).await {
            let status = self.executor.execute(&name, &state).await;
            report.record_outcome(name, status);
        }

        self.finish(state, report).await
    }

    /// Split `tasks` into those to dispatch and those to skip, emitting a
    /// skip event for the latter.
    async fn triage<'a>(
        &self,
        tasks: impl IntoIterator<Item = &'a str>,
        state: &SharedState,
        report: &mut RunReport,
    ) -> Vec<TaskName> {
        let store = state.lock().await;
        let mut runnable = Vec::new();

        for task in tasks {
            if store.status(task) == TaskStatus::Succeeded {
                self.sink.emit(SchedulerEvent::TaskSkipped {
                    task: task.to_string(),
                    reason: SkipReason::AlreadySucceeded,
                });
                report.record_already_succeeded(task.to_string());
                continue;
            }

            let blocking = store.unsatisfied(self.graph.dependencies_of(task));
            if !blocking.is_empty() {
                self.sink.emit(SchedulerEvent::TaskSkipped {
                    task: task.to_string(),
                    reason: SkipReason::DependenciesUnsatisfied { blocking },
                });
                report.record_blocked(task.to_string());
                continue;
            }

            runnable.push(task.to_string());
        }

        runnable
    }

    /// Dispatch `tasks` concurrently and wait for all of them.
    async fn run_level(
        &self,
        tasks: Vec<TaskName>,
        state: &SharedState,
        limiter: Option<&Arc<Semaphore>>,
        report: &mut RunReport,
    ) {
        let mut workers = JoinSet::new();
        let mut in_flight = HashMap::new();

        for task in tasks {
            let executor = self.executor.clone();
            let state = Arc::clone(state);
            let limiter = limiter.cloned();
            let name = task.clone();

            let handle = workers.spawn(async move {
                // Held until the task reaches its terminal status.
                let _permit = match limiter {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let status = executor.execute(&name, &state).await;
                (name, status)
            });
            in_flight.insert(handle.id(), task);
        }

        while let Some(joined) = workers.join_next_with_id().await {
            match joined {
                Ok((id, (task, status))) => {
                    in_flight.remove(&id);
                    report.record_outcome(task, status);
                }
                Err(err) => {
                    // The body itself is contained by the executor; this is
                    // a failure of the surrounding worker.
                    let Some(task) = in_flight.remove(&err.id()) else {
                        continue;
                    };
                    error!(task = %task, error = %err, "task worker did not complete");
                    state.lock().await.set(&task, TaskStatus::Failed);
                    report.record_outcome(task, TaskStatus::Failed);
                }
            }
        }
    }

    /// Persist the final state and close the report.
    async fn finish(&self, state: SharedState, mut report: RunReport) -> Result<RunReport> {
        let final_state = state.lock().await.clone();

        final_state.save(self.persistence.as_ref())?;
        self.sink.emit(SchedulerEvent::StatePersisted {
            tasks: final_state.len(),
        });

        self.sink.emit(SchedulerEvent::RunCompleted {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
            skipped: report.skipped(),
        });

        report.finish(final_state);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::DispatchTable;
    use crate::state::MemoryState;

    fn ok_table(names: &[&str]) -> Arc<dyn ExecutorBackend> {
        let mut table = DispatchTable::new();
        for name in names {
            table.insert(*name, || async { Ok(()) });
        }
        Arc::new(table)
    }

    #[test]
    fn cyclic_graph_is_rejected_at_construction() {
        let graph =
            DependencyGraph::build([("a", vec!["b"]), ("b", vec!["a"])]).unwrap();
        let err = Scheduler::new(
            graph,
            ok_table(&["a", "b"]),
            Arc::new(MemoryState::new()),
            SchedulerOptions::default(),
        )
        .err()
        .unwrap();

        assert!(matches!(err, StagedagError::CyclicDependency { .. }));
    }

    #[test]
    fn every_task_needs_a_body() {
        let graph = DependencyGraph::build([("a", vec![]), ("b", vec!["a"])]).unwrap();
        let err = Scheduler::new(
            graph,
            ok_table(&["a"]),
            Arc::new(MemoryState::new()),
            SchedulerOptions::default(),
        )
        .err()
        .unwrap();

        assert!(matches!(err, StagedagError::UnboundTask(ref t) if t == "b"));
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let graph = DependencyGraph::build([("a", Vec::<&str>::new())]).unwrap();
        let options = SchedulerOptions {
            max_parallel: Some(0),
            ..SchedulerOptions::default()
        };
        let err = Scheduler::new(
            graph,
            ok_table(&["a"]),
            Arc::new(MemoryState::new()),
            options,
        )
        .err()
        .unwrap();

        assert!(matches!(err, StagedagError::ConfigError(_)));
    }

    #[tokio::test]
    async fn runs_a_chain_in_order() {
        let graph = DependencyGraph::build([
            ("c", vec!["a", "b"]),
            ("a", vec![]),
            ("b", vec!["a"]),
        ])
        .unwrap();
        let scheduler = Scheduler::new(
            graph,
            ok_table(&["a", "b", "c"]),
            Arc::new(MemoryState::new()),
            SchedulerOptions::default(),
        )
        .unwrap();

        assert_eq!(scheduler.plan().len(), 3);
        assert_eq!(scheduler.plan().level_of("c"), Some(2));

        let report = scheduler.run().await.unwrap();
        assert_eq!(report.invoked, vec!["a", "b", "c"]);
        assert!(report.is_success());
    }
}
