//! First-run policy
//!
//! Decides what a repository without a checkpoint announces.

use serde::{Deserialize, Serialize};

/// What to announce for a repository that has never been announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FirstRun {
    /// Announce nothing and remember the current head
    #[default]
    StartFromHead,
    /// Announce the whole history, oldest first
    Replay,
}

impl std::fmt::Display for FirstRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartFromHead => write!(f, "start-from-head"),
            Self::Replay => write!(f, "replay"),
        }
    }
}

impl std::str::FromStr for FirstRun {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "start-from-head" | "head" | "skip" => Ok(Self::StartFromHead),
            "replay" | "history" => Ok(Self::Replay),
            _ => Err(format!("Unknown first-run policy: {s}. Use 'start-from-head' or 'replay'")),
        }
    }
}
