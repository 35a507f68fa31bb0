//! Commit source port
//!
//! Defines the read-only view of a watched repository.

use async_trait::async_trait;

use crate::core::error::RepositoryError;
use crate::core::models::{NewCommits, Reference};

/// Read-only access to a repository's history
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// Commits newer than `since`, oldest first, with the tip they were read from
    ///
    /// With `since = None` the first-run policy applies: either nothing
    /// or the whole history. A `since` the repository does not know is
    /// handled the same way and reported through `checkpoint_known`.
    async fn commits_since(&self, since: Option<&Reference>) -> Result<NewCommits, RepositoryError>;
}
