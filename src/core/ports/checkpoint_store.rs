//! Checkpoint store port
//!
//! Defines the interface for persisting the last announced commit of each
//! repository.

use crate::core::error::PersistenceError;
use crate::core::models::Checkpoint;

/// Durable map of repository id to checkpoint
///
/// `save` must replace the stored checkpoint atomically: after a crash the
/// store holds either the old or the new checkpoint, never a mix.
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint of a repository, if one was ever saved
    fn load(&self, repo_id: &str) -> Result<Option<Checkpoint>, PersistenceError>;

    /// Store a checkpoint, replacing the previous one for that repository
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;

    /// All stored checkpoints, sorted by repository id
    fn list(&self) -> Result<Vec<Checkpoint>, PersistenceError>;
}
