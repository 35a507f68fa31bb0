//! JSON state file holding every repository's checkpoint
//!
//! ```json
//! {
//!   "version": 1,
//!   "checkpoints": {
//!     "combotcha": { "reference": "1a2b...", "updated_at": "2024-05-01T12:00:00Z" }
//!   }
//! }
//! ```
//!
//! Saves go through a temporary file in the same directory which is
//! flushed and then renamed over the state file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::error::PersistenceError;
use crate::core::models::{Checkpoint, Reference};
use crate::core::ports::CheckpointStore;

const STATE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default = "state_version")]
    version: u32,
    #[serde(default)]
    checkpoints: BTreeMap<String, StoredCheckpoint>,
}

const fn state_version() -> u32 {
    STATE_VERSION
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCheckpoint {
    reference: Reference,
    updated_at: DateTime<Utc>,
}

/// Checkpoints kept in a JSON file
#[derive(Debug)]
pub struct FileCheckpointStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCheckpointStore {
    /// Store backed by the file at `path`; it is created on first save
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the state file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read(&self) -> Result<StateFile, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StateFile::default()),
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(StateFile::default());
        }
        serde_json::from_str(&content).map_err(|e| PersistenceError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn write(&self, state: &StateFile) -> Result<(), PersistenceError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        let content = serde_json::to_string_pretty(state)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(content.as_bytes()).map_err(|e| self.io_error(e))?;
        tmp.write_all(b"\n").map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, repo_id: &str) -> Result<Option<Checkpoint>, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.read()?;
        Ok(state.checkpoints.get(repo_id).map(|stored| Checkpoint {
            repo_id: repo_id.to_string(),
            reference: stored.reference.clone(),
            updated_at: stored.updated_at,
        }))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.read()?;
        state.version = STATE_VERSION;
        state.checkpoints.insert(
            checkpoint.repo_id.clone(),
            StoredCheckpoint {
                reference: checkpoint.reference.clone(),
                updated_at: checkpoint.updated_at,
            },
        );
        self.write(&state)?;
        log::debug!("Saved checkpoint {} = {}", checkpoint.repo_id, checkpoint.reference.short());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Checkpoint>, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.read()?;
        Ok(state
            .checkpoints
            .into_iter()
            .map(|(repo_id, stored)| Checkpoint {
                repo_id,
                reference: stored.reference,
                updated_at: stored.updated_at,
            })
            .collect())
    }
}
