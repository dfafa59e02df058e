// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the in-process
//!   [`DispatchTable`] that binds task names to closures.
//! - [`command`] is the process backend: one shell command per task, run
//!   with `tokio::process::Command`.
//! - [`executor`] runs a single task through a backend, records its
//!   `Running` and terminal status in the shared state store and reports
//!   the outcome to the event sink.

pub mod backend;
pub mod command;
pub mod executor;

pub use backend::{DispatchTable, ExecutorBackend, TaskFuture};
pub use command::CommandBackend;
pub use executor::{SharedState, TaskExecutor};
