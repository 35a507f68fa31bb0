//! Notifier - the per-repository polling and delivery loop
//!
//! A [`RepoWatcher`] owns the state of one repository and cycles through
//! Idle → Polling → Delivering → Idle, or into Backoff when anything
//! fails. Each commit is sent before the checkpoint moves past it, so a
//! crash or a lost connection can repeat an announcement but never drop
//! one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};

use super::backoff::{Backoff, BackoffConfig};
use super::formatter::MessageFormatter;
use super::shared_transport::SharedTransport;
use crate::core::error::{CycleError, RepositoryError};
use crate::core::models::{Checkpoint, Commit, NewCommits, Reference};
use crate::core::ports::{CheckpointStore, CommitSource};

/// Where a watcher is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the next tick
    #[default]
    Idle,
    /// Asking the repository for new commits
    Polling,
    /// Sending commits to the channel
    Delivering,
    /// Waiting to retry after a failure
    Backoff,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Polling => write!(f, "polling"),
            Self::Delivering => write!(f, "delivering"),
            Self::Backoff => write!(f, "backoff"),
        }
    }
}

/// Timing and delivery settings of a watcher
#[derive(Debug, Clone, Copy)]
pub struct WatcherSettings {
    /// Delay between polls while healthy
    pub poll_interval: Duration,
    /// Bound on one repository read
    pub read_timeout: Duration,
    /// Bound on one connect, join or send
    pub send_timeout: Duration,
    /// Announce `<repo> (<n> new commits)` before each batch
    pub announce_batches: bool,
    /// Retry pacing after failures
    pub backoff: BackoffConfig,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            send_timeout: Duration::from_secs(15),
            announce_batches: false,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Mutable state of one watched repository
#[derive(Debug, Clone)]
pub struct WatchState {
    phase: Phase,
    checkpoint: Option<Reference>,
    unsaved: bool,
    loaded: bool,
    backoff: Backoff,
}

impl WatchState {
    fn new(backoff: BackoffConfig) -> Self {
        Self {
            phase: Phase::Idle,
            checkpoint: None,
            unsaved: false,
            loaded: false,
            backoff: Backoff::new(backoff),
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Newest delivered commit, as known in memory
    #[must_use]
    pub const fn checkpoint(&self) -> Option<&Reference> {
        self.checkpoint.as_ref()
    }

    /// Whether the in-memory checkpoint still has to be persisted
    #[must_use]
    pub const fn unsaved(&self) -> bool {
        self.unsaved
    }

    /// Consecutive failed cycles
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.backoff.failures()
    }
}

/// Result of one cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Nothing to announce
    Idle {
        /// Head adopted as checkpoint, on a first run or when the checkpoint was unknown
        adopted_head: Option<Reference>,
    },
    /// Every new commit was announced
    Delivered {
        /// Number of commits sent
        count: usize,
    },
    /// The cycle failed; the watcher waits `delay` before polling again
    Backoff {
        /// Commits sent before the failure
        delivered: usize,
        /// What went wrong
        error: CycleError,
        /// Wait before the next attempt
        delay: Duration,
    },
}

/// Polls one repository and announces its new commits
pub struct RepoWatcher {
    name: String,
    source: Arc<dyn CommitSource>,
    store: Arc<dyn CheckpointStore>,
    transport: SharedTransport,
    formatter: MessageFormatter,
    settings: WatcherSettings,
    seed: Option<Reference>,
    trigger: Option<Arc<Notify>>,
    state: WatchState,
}

impl std::fmt::Debug for RepoWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoWatcher")
            .field("name", &self.name)
            .field("transport", &self.transport)
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl RepoWatcher {
    /// Create a watcher for the repository `name`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn CommitSource>,
        store: Arc<dyn CheckpointStore>,
        transport: SharedTransport,
        formatter: MessageFormatter,
        settings: WatcherSettings,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            store,
            transport,
            formatter,
            state: WatchState::new(settings.backoff),
            settings,
            seed: None,
            trigger: None,
        }
    }

    /// Checkpoint to start from when the store has none
    #[must_use]
    pub fn with_seed(mut self, seed: Option<Reference>) -> Self {
        self.seed = seed;
        self
    }

    /// Poll early whenever `trigger` is notified
    #[must_use]
    pub fn with_trigger(mut self, trigger: Arc<Notify>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Repository name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &WatchState {
        &self.state
    }

    /// Run cycles until `shutdown` turns true or its sender goes away
    ///
    /// A cycle in progress always completes; only the waits between
    /// cycles are interrupted.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        log::info!("[{}] Watching for new commits", self.name);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delay = match self.poll_once().await {
                CycleOutcome::Backoff { delay, .. } => delay,
                _ => self.settings.poll_interval,
            };

            let trigger = self.trigger.clone();
            tokio::select! {
                () = tokio::time::sleep(delay) => {},
                () = async {
                    match trigger {
                        Some(t) => t.notified().await,
                        None => std::future::pending().await,
                    }
                } => {
                    log::debug!("[{}] Poll triggered", self.name);
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
            }
        }

        self.flush_checkpoint();
        log::info!("[{}] Watcher stopped", self.name);
    }

    /// Run exactly one cycle
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let mut delivered = 0;
        match self.cycle(&mut delivered).await {
            Ok(outcome) => {
                self.state.backoff.reset();
                self.state.phase = Phase::Idle;
                outcome
            },
            Err(error) => {
                let delay = self.state.backoff.next_delay();
                self.state.phase = Phase::Backoff;
                log::warn!(
                    "[{}] Cycle failed after {delivered} delivered: {error}; retrying in {}s",
                    self.name,
                    delay.as_secs()
                );
                CycleOutcome::Backoff {
                    delivered,
                    error,
                    delay,
                }
            },
        }
    }

    async fn cycle(&mut self, delivered: &mut usize) -> Result<CycleOutcome, CycleError> {
        self.ensure_loaded()?;
        self.flush_checkpoint();

        self.state.phase = Phase::Polling;
        let since = self.state.checkpoint.clone();
        let read = self.read_commits(since.as_ref()).await?;
        let commits = skip_delivered(read.commits, since.as_ref());

        if commits.is_empty() {
            let adopted_head = if read.checkpoint_known {
                None
            } else {
                self.adopt_head(since.as_ref(), read.head)
            };
            log::debug!("[{}] No new commits", self.name);
            return Ok(CycleOutcome::Idle { adopted_head });
        }

        self.state.phase = Phase::Delivering;
        log::info!("[{}] {} new commit(s) found", self.name, commits.len());

        if self.settings.announce_batches {
            let header = self.formatter.format_batch_header(commits.len());
            self.transport.deliver(&header, self.settings.send_timeout).await?;
        }

        for commit in commits {
            let line = self.formatter.format(&commit);
            self.transport.deliver(&line, self.settings.send_timeout).await?;
            *delivered += 1;
            log::debug!("[{}] Announced {}", self.name, commit.reference.short());
            self.advance(commit.reference);
        }

        Ok(CycleOutcome::Delivered { count: *delivered })
    }

    /// Load the persisted checkpoint once; the seed fills in when there is none
    fn ensure_loaded(&mut self) -> Result<(), CycleError> {
        if self.state.loaded {
            return Ok(());
        }
        self.state.checkpoint = match self.store.load(&self.name)? {
            Some(checkpoint) => {
                log::info!("[{}] Resuming after {}", self.name, checkpoint.reference.short());
                Some(checkpoint.reference)
            },
            None => {
                if let Some(seed) = &self.seed {
                    log::info!("[{}] Starting from configured commit {}", self.name, seed.short());
                }
                self.seed.clone()
            },
        };
        self.state.loaded = true;
        Ok(())
    }

    async fn read_commits(&self, since: Option<&Reference>) -> Result<NewCommits, RepositoryError> {
        let limit = self.settings.read_timeout;
        tokio::time::timeout(limit, self.source.commits_since(since))
            .await
            .unwrap_or_else(|_| Err(RepositoryError::Unavailable(format!("read timed out after {limit:?}"))))
    }

    /// Take the head of the same read as checkpoint without announcing anything
    ///
    /// Only when there is no checkpoint yet, or the repository no longer
    /// knows it (rewritten branch); a known checkpoint only moves by delivery.
    fn adopt_head(&mut self, since: Option<&Reference>, head: Option<Reference>) -> Option<Reference> {
        let head = head?;
        match since {
            Some(since) if head.matches(since) => return None,
            Some(since) => log::info!(
                "[{}] Checkpoint {} is not in the history, moving to {}",
                self.name,
                since.short(),
                head.short()
            ),
            None => log::info!("[{}] First run, starting from {}", self.name, head.short()),
        }
        self.advance(head.clone());
        Some(head)
    }

    /// Move the checkpoint to a delivered commit and persist it
    fn advance(&mut self, reference: Reference) {
        self.state.checkpoint = Some(reference);
        self.state.unsaved = true;
        self.flush_checkpoint();
    }

    fn flush_checkpoint(&mut self) {
        if !self.state.unsaved {
            return;
        }
        let Some(reference) = self.state.checkpoint.clone() else {
            return;
        };
        match self.store.save(&Checkpoint::new(self.name.clone(), reference)) {
            Ok(()) => self.state.unsaved = false,
            Err(e) => log::warn!("[{}] Cannot save checkpoint, will retry: {e}", self.name),
        }
    }
}

/// Drop anything at or before the checkpoint, should the source return it
fn skip_delivered(mut commits: Vec<Commit>, since: Option<&Reference>) -> Vec<Commit> {
    if let Some(since) = since
        && let Some(pos) = commits.iter().rposition(|c| c.reference.matches(since))
    {
        commits.drain(..=pos);
    }
    commits
}
