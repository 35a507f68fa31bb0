//! Port traits (interfaces) for external dependencies
//!
//! These traits define the boundaries between the notifier and the
//! systems it talks to: the repository, the chat network and the state
//! file. Implementations live in the `adapters` module; tests supply
//! in-memory ones.

mod checkpoint_store;
mod commit_source;
mod transport;

pub use checkpoint_store::CheckpointStore;
pub use commit_source::CommitSource;
pub use transport::ChatTransport;
