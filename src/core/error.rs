//! Error taxonomy for a notification cycle
//!
//! Every error a running watcher can hit is transient: it is logged and
//! turns into a backoff-and-retry. Configuration errors live in
//! [`crate::config`] and only occur at startup.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The watched repository could not be read
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Transient read failure (I/O, fetch, timeout)
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// The repository could not be opened or cloned
    #[error("cannot open repository at {path}: {reason}")]
    Open {
        /// Local path of the repository
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },
}

impl From<git2::Error> for RepositoryError {
    fn from(err: git2::Error) -> Self {
        Self::Unavailable(err.message().to_string())
    }
}

/// The chat transport failed
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connection could not be established
    #[error("connect to {address} failed: {reason}")]
    Connect {
        /// Server address
        address: String,
        /// Underlying failure
        reason: String,
    },

    /// The server rejected or aborted registration
    #[error("registration failed: {0}")]
    Registration(String),

    /// Every nickname variant was taken
    #[error("nickname {0} is already in use")]
    NickInUse(String),

    /// The channel could not be joined
    #[error("cannot join {channel}: {reason}")]
    Join {
        /// Channel name
        channel: String,
        /// Server reply
        reason: String,
    },

    /// Writing a line failed
    #[error("send failed: {0}")]
    Send(String),

    /// The operation needs a live connection
    #[error("not connected")]
    Disconnected,

    /// The operation did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Send(err.to_string())
    }
}

/// Checkpoints could not be read or written
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// File system failure
    #[error("state file {path}: {source}")]
    Io {
        /// State file path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// The state file exists but is not valid
    #[error("state file {path} is corrupt: {reason}")]
    Corrupt {
        /// State file path
        path: PathBuf,
        /// Parse failure
        reason: String,
    },

    /// Checkpoints could not be serialized
    #[error("cannot encode checkpoints: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Any failure during one watcher cycle
#[derive(Debug, Error)]
pub enum CycleError {
    /// Reading commits failed
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Delivering a line failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Loading or saving the checkpoint failed
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
