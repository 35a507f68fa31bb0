//! File-based checkpoint storage
//!
//! Implements `CheckpointStore` using one JSON state file.

mod store;

pub use store::FileCheckpointStore;
