//! Commit model
//!
//! The metadata of one commit, as read from the watched repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Reference;

/// A commit read from a repository. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Commit id
    pub reference: Reference,
    /// Author display name
    pub author: String,
    /// Author timestamp
    pub timestamp: DateTime<Utc>,
    /// First line of the commit message
    pub subject: String,
}

impl Commit {
    /// Create a commit record.
    ///
    /// Only the first line of `message` is kept as the subject.
    #[must_use]
    pub fn new(
        reference: impl Into<Reference>,
        author: impl Into<String>,
        timestamp: DateTime<Utc>,
        message: &str,
    ) -> Self {
        Self {
            reference: reference.into(),
            author: author.into(),
            timestamp,
            subject: message.lines().next().unwrap_or_default().trim_end().to_string(),
        }
    }
}
