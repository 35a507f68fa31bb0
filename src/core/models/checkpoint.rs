//! Checkpoint model
//!
//! The last commit announced for one repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Reference;

/// Last-notified commit of a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Repository identifier (its configured name)
    pub repo_id: String,
    /// Newest commit that was delivered
    pub reference: Reference,
    /// When the checkpoint last moved
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a checkpoint stamped with the current time
    #[must_use]
    pub fn new(repo_id: impl Into<String>, reference: Reference) -> Self {
        Self {
            repo_id: repo_id.into(),
            reference,
            updated_at: Utc::now(),
        }
    }
}
