//! Core domain logic for combotcha
//!
//! Business logic with no direct I/O. Everything external (the git
//! repository, the IRC network, the state file) is reached through port
//! traits.
//!
//! ## Architecture
//!
//! - `models/` - Domain types (Commit, Reference, Checkpoint)
//! - `error` - Failure taxonomy of a notification cycle
//! - `ports/` - Trait definitions for external dependencies
//! - `services/` - Formatting and the notifier loop

pub mod error;
pub mod models;
pub mod ports;
pub mod services;
