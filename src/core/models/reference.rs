//! Commit reference
//!
//! A reference names exactly one commit. For git this is the hex object id.

use serde::{Deserialize, Serialize};

/// Number of hex digits shown when a reference is displayed in chat
pub const SHORT_LEN: usize = 8;

/// Unique identifier of a commit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(String);

impl Reference {
    /// Wrap a commit id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_lowercase())
    }

    /// The full commit id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated id for display
    #[must_use]
    pub fn short(&self) -> &str {
        let end = self.0.char_indices().nth(SHORT_LEN).map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }

    /// Whether this reference and `other` name the same commit.
    ///
    /// Either side may be abbreviated (a configured seed often is), so
    /// the shorter one must be a non-empty prefix of the longer one.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        let (short, long) = if self.0.len() <= other.0.len() {
            (&self.0, &other.0)
        } else {
            (&other.0, &self.0)
        };
        !short.is_empty() && long.starts_with(short.as_str())
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Reference {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Reference {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
