//! combotcha - announce new commits of watched git repositories on IRC
//!
//! Each configured repository is polled on a timer. New commits are
//! formatted into one chat line each and posted to a channel; the last
//! announced commit is checkpointed so restarts resume where they left
//! off. Delivery is at-least-once: a failure can repeat a line, never
//! drop one.

// Deny all clippy warnings in this crate
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces
)]
#![warn(missing_copy_implementations, unused_qualifications)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cargo_common_metadata
)]

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adapters;
pub mod config;
pub mod core;
pub mod output;
pub mod paths;
