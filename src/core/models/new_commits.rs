//! Result of one history read

use super::{Commit, Reference};

/// Commits after a checkpoint, read from one snapshot of the branch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCommits {
    /// Commits newer than the checkpoint, oldest first
    pub commits: Vec<Commit>,
    /// Tip of the branch in the same snapshot; `None` without commits
    pub head: Option<Reference>,
    /// Whether the checkpoint was found in the history
    pub checkpoint_known: bool,
}

impl NewCommits {
    /// Nothing new
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            commits: Vec::new(),
            head: None,
            checkpoint_known: false,
        }
    }
}
