// src/state/persist.rs

//! Where the state store lives between runs.
//!
//! - [`YamlStateFile`] keeps it in a YAML file (default `state.yml`), read and
//!   written through the [`FileSystem`] seam.
//! - [`MemoryState`] keeps it in process, for tests and embedders that do not
//!   want a file.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::engine::TaskName;
use crate::errors::{Result, StagedagError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::state::status::TaskStatus;

/// Serializable form of the state store. `None` stands for `Unknown`.
pub type PersistedState = BTreeMap<TaskName, Option<TaskStatus>>;

/// Storage backend for the state store.
pub trait StatePersistence: Send + Sync + Debug {
    /// Read the persisted state; `Ok(None)` means nothing has been persisted
    /// yet.
    fn load(&self) -> Result<Option<PersistedState>>;

    /// Replace the persisted state.
    fn save(&self, state: &PersistedState) -> Result<()>;
}

/// State persisted as a YAML mapping of task name to status literal.
///
/// ```yaml
/// build: SUCCESS
/// lint: FAILED
/// docs: null
/// ```
#[derive(Debug, Clone)]
pub struct YamlStateFile {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl YamlStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_fs(Arc::new(RealFileSystem), path)
    }

    pub fn with_fs(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatePersistence for YamlStateFile {
    fn load(&self) -> Result<Option<PersistedState>> {
        if !self.fs.exists(&self.path) {
            debug!(path = ?self.path, "state file not found");
            return Ok(None);
        }

        let contents = self.fs.read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Some(PersistedState::new()));
        }

        let state: PersistedState = serde_yaml::from_str(&contents).map_err(|e| {
            StagedagError::StateError(format!("parsing state file {:?}: {}", self.path, e))
        })?;

        Ok(Some(state))
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        let yaml = serde_yaml::to_string(state)?;
        self.fs.write(&self.path, yaml.as_bytes())?;
        debug!(path = ?self.path, entries = state.len(), "state file written");
        Ok(())
    }
}

/// In-process persistence. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    slot: Arc<Mutex<Option<PersistedState>>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `state` already persisted.
    pub fn seeded(state: PersistedState) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(state))),
        }
    }

    /// What was saved last, if anything.
    pub fn snapshot(&self) -> Option<PersistedState> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl StatePersistence for MemoryState {
    fn load(&self) -> Result<Option<PersistedState>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| StagedagError::StateError("memory state lock poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| StagedagError::StateError("memory state lock poisoned".to_string()))?;
        *slot = Some(state.clone());
        Ok(())
    }
}
