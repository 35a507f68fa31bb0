//! Git integration adapter
//!
//! Implements `CommitSource` with libgit2.
//!
//! The repository is opened (or cloned from its URL) on first use, so a
//! network outage at startup is just another transient read failure.
//! Each read fetches `origin` and walks the remote-tracking branch.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::DateTime;
use git2::{BranchType, Oid, Repository, Sort};

use crate::core::error::RepositoryError;
use crate::core::models::{Commit, FirstRun, NewCommits, Reference};
use crate::core::ports::CommitSource;

const REMOTE: &str = "origin";

/// How to reach one watched repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSourceOptions {
    /// Remote URL to clone from, if the local copy does not exist yet
    pub url: Option<String>,
    /// Local working copy
    pub path: PathBuf,
    /// Branch to follow; the remote default branch when unset
    pub branch: Option<String>,
    /// What a read without checkpoint returns
    pub first_run: FirstRun,
}

/// Git-backed commit source
#[derive(Debug, Clone)]
pub struct GitCommitSource {
    inner: Arc<Mutex<GitReader>>,
}

impl GitCommitSource {
    /// Create a source; nothing is opened until the first read
    #[must_use]
    pub fn new(options: GitSourceOptions) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GitReader {
                options,
                repo: None,
            })),
        }
    }

    async fn with_reader<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&mut GitReader) -> Result<T, RepositoryError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut reader = inner.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut reader)
        })
        .await
        .map_err(|e| RepositoryError::Unavailable(format!("reader task failed: {e}")))?
    }
}

#[async_trait]
impl CommitSource for GitCommitSource {
    async fn commits_since(&self, since: Option<&Reference>) -> Result<NewCommits, RepositoryError> {
        let since = since.cloned();
        self.with_reader(move |reader| reader.commits_since(since.as_ref())).await
    }
}

struct GitReader {
    options: GitSourceOptions,
    repo: Option<Repository>,
}

impl std::fmt::Debug for GitReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitReader")
            .field("options", &self.options)
            .field("open", &self.repo.is_some())
            .finish()
    }
}

impl GitReader {
    /// Open the working copy, cloning it first if needed
    fn repository(&mut self) -> Result<&Repository, RepositoryError> {
        if self.repo.is_none() {
            self.repo = Some(open_or_clone(&self.options)?);
        }
        self.repo
            .as_ref()
            .ok_or_else(|| RepositoryError::Unavailable("repository not open".to_string()))
    }

    fn commits_since(&mut self, since: Option<&Reference>) -> Result<NewCommits, RepositoryError> {
        let first_run = self.options.first_run;
        let branch = self.options.branch.clone();
        let repo = self.repository()?;
        fetch(repo)?;

        let Some(tip) = tip(repo, branch.as_deref())? else {
            return Ok(NewCommits::empty());
        };

        let boundary = match since {
            Some(reference) => {
                let found = resolve(repo, reference);
                if found.is_none() {
                    log::warn!("Checkpoint {} not found in repository, applying first-run policy", reference.short());
                }
                found
            },
            None => None,
        };

        let commits = match boundary {
            Some(boundary) => walk(repo, tip, Some(boundary))?,
            None => match first_run {
                FirstRun::StartFromHead => Vec::new(),
                FirstRun::Replay => walk(repo, tip, None)?,
            },
        };
        Ok(NewCommits {
            commits,
            head: Some(Reference::new(tip.to_string())),
            checkpoint_known: boundary.is_some(),
        })
    }
}

fn open_or_clone(options: &GitSourceOptions) -> Result<Repository, RepositoryError> {
    let open_error = |reason: String| RepositoryError::Open {
        path: options.path.clone(),
        reason,
    };

    if options.path.exists() {
        return Repository::open(&options.path).map_err(|e| open_error(e.message().to_string()));
    }

    let Some(url) = &options.url else {
        return Err(open_error("path does not exist and no url is configured".to_string()));
    };

    if let Some(parent) = options.path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| open_error(e.to_string()))?;
    }
    log::info!("Cloning {url} into {}", options.path.display());
    Repository::clone(url, &options.path).map_err(|e| {
        // A half-written clone would be mistaken for a working copy next time.
        let _ = std::fs::remove_dir_all(&options.path);
        RepositoryError::Unavailable(format!("clone of {url} failed: {}", e.message()))
    })
}

fn fetch(repo: &Repository) -> Result<(), RepositoryError> {
    let mut remote = match repo.find_remote(REMOTE) {
        Ok(remote) => remote,
        Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    remote
        .fetch::<&str>(&[], None, None)
        .map_err(|e| RepositoryError::Unavailable(format!("fetch failed: {}", e.message())))
}

/// Commit at the tip of the watched branch
///
/// Remote-tracking refs win over local ones so fetched commits are seen.
fn tip(repo: &Repository, branch: Option<&str>) -> Result<Option<Oid>, RepositoryError> {
    let branch = match branch {
        Some(branch) => Some(branch.to_string()),
        None => default_branch(repo),
    };

    if let Some(branch) = branch {
        let candidates = [format!("refs/remotes/{REMOTE}/{branch}"), format!("refs/heads/{branch}")];
        for name in &candidates {
            if let Ok(oid) = repo.refname_to_id(name) {
                return Ok(Some(oid));
            }
        }
    }

    match repo.head() {
        Ok(head) => Ok(head.target()),
        Err(e) if matches!(e.code(), git2::ErrorCode::UnbornBranch | git2::ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Branch the remote's HEAD points at, or else the local checked-out branch
fn default_branch(repo: &Repository) -> Option<String> {
    let remote_head = format!("refs/remotes/{REMOTE}/HEAD");
    if let Ok(reference) = repo.find_reference(&remote_head)
        && let Some(target) = reference.symbolic_target()
    {
        let prefix = format!("refs/remotes/{REMOTE}/");
        if let Some(name) = target.strip_prefix(&prefix) {
            return Some(name.to_string());
        }
    }

    let head = repo.head().ok()?;
    if !head.is_branch() {
        return None;
    }
    let name = head.shorthand()?.to_string();
    repo.find_branch(&name, BranchType::Local).ok().map(|_| name)
}

/// Resolve a possibly abbreviated reference to a commit in the repository
fn resolve(repo: &Repository, reference: &Reference) -> Option<Oid> {
    repo.find_commit_by_prefix(reference.as_str()).ok().map(|c| c.id())
}

/// Commits reachable from `tip` but not from `boundary`, oldest first
fn walk(repo: &Repository, tip: Oid, boundary: Option<Oid>) -> Result<Vec<Commit>, RepositoryError> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
    revwalk.push(tip)?;
    if let Some(boundary) = boundary {
        revwalk.hide(boundary)?;
    }

    revwalk
        .map(|oid| {
            let commit = repo.find_commit(oid?)?;
            Ok(to_commit(&commit))
        })
        .collect()
}

fn to_commit(commit: &git2::Commit<'_>) -> Commit {
    let author = commit.author();
    let timestamp = DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default();
    Commit::new(
        commit.id().to_string(),
        author.name().unwrap_or("unknown"),
        timestamp,
        commit.message().unwrap_or_default(),
    )
}
