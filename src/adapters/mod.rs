//! Adapter implementations for port traits
//!
//! This module contains concrete implementations that handle I/O:
//!
//! - `git/` - Commit history via libgit2
//! - `irc/` - IRC client over TCP
//! - `file/` - JSON checkpoint state file

pub mod file;
pub mod git;
pub mod irc;
