// src/state/mod.rs

//! Durable per-task state.
//!
//! - [`status`] defines the task lifecycle ([`TaskStatus`]).
//! - [`store`] holds the in-memory mapping and the dependency-satisfaction
//!   check.
//! - [`persist`] defines where the store is kept between runs.

pub mod persist;
pub mod status;
pub mod store;

pub use persist::{MemoryState, PersistedState, StatePersistence, YamlStateFile};
pub use status::TaskStatus;
pub use store::StateStore;
