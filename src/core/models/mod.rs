//! Domain models for combotcha
//!
//! Pure data structures with no I/O dependencies.
//!
//! - [`Commit`] - One commit's metadata
//! - [`Reference`] - A commit id
//! - [`Checkpoint`] - The last commit announced for a repository
//! - [`NewCommits`] - What one history read found
//! - [`NotificationTarget`] - Where announcements are posted
//! - [`FirstRun`] - What a repository without a checkpoint announces

mod checkpoint;
mod commit;
mod first_run;
mod new_commits;
mod reference;
mod target;

pub use checkpoint::Checkpoint;
pub use commit::Commit;
pub use first_run::FirstRun;
pub use new_commits::NewCommits;
pub use reference::{Reference, SHORT_LEN};
pub use target::NotificationTarget;
