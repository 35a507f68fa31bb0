//! Notification services
//!
//! Orchestration that operates on the ports and domain models:
//!
//! - [`formatter`] - Render commits as chat lines
//! - [`backoff`] - Exponential retry pacing
//! - [`shared_transport`] - One chat connection shared by all watchers
//! - [`notifier`] - The per-repository poll and delivery loop

pub mod backoff;
pub mod formatter;
pub mod notifier;
pub mod shared_transport;

pub use backoff::{Backoff, BackoffConfig};
pub use formatter::{DEFAULT_MAX_LINE_BYTES, MessageFormatter, truncate_to_bytes};
pub use notifier::{CycleOutcome, Phase, RepoWatcher, WatchState, WatcherSettings};
pub use shared_transport::SharedTransport;
