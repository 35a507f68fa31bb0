//! Configuration management
//!
//! The whole runtime configuration comes from one TOML file, read once at
//! startup:
//!
//! ```toml
//! [irc]
//! server = "irc.libera.chat:6667"
//! channel = "#commits"
//! nick = "combotcha"
//!
//! [notifier]
//! poll_interval_secs = 10
//!
//! [[repos]]
//! name = "engine"
//! url = "https://git.example/engine.git"
//! ```
//!
//! Errors here are the only fatal ones: the process refuses to start.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::git::GitSourceOptions;
use crate::adapters::irc::IrcConfig;
use crate::core::models::{FirstRun, NotificationTarget, Reference};
use crate::core::services::{BackoffConfig, DEFAULT_MAX_LINE_BYTES, MessageFormatter, WatcherSettings};
use crate::paths;

/// Errors raised while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has the wrong shape
    #[error("cannot parse config {path}: {reason}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A value is out of range or inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root of the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// IRC network and channel
    pub irc: IrcSection,
    /// Timings and message layout
    #[serde(default)]
    pub notifier: NotifierSection,
    /// Watched repositories
    #[serde(default)]
    pub repos: Vec<RepoSection>,
}

/// `[irc]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IrcSection {
    /// Server as `host:port`
    pub server: String,
    /// Channel to announce in
    pub channel: String,
    /// Nickname
    #[serde(default = "default_nick")]
    pub nick: String,
    /// Username; defaults to the nick
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Real name; defaults to the nick
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realname: Option<String>,
    /// Message sent when leaving
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

fn default_nick() -> String {
    "combotcha".to_string()
}

fn default_quit_message() -> String {
    "Bye-bye-bye-bye-bye-bye-bye!!".to_string()
}

/// `[notifier]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifierSection {
    /// Seconds between polls of each repository
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Bound on one repository read (fetch and walk)
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Bound on one IRC connect, join or send
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// What a repository without checkpoint announces
    #[serde(default)]
    pub first_run: FirstRun,
    /// Byte bound for one announced line
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Use mIRC colors
    #[serde(default = "default_true")]
    pub colors: bool,
    /// Send `<repo> (<n> new commits)` before each batch
    #[serde(default)]
    pub announce_batches: bool,
    /// First retry delay after a failure
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_secs: u64,
    /// Longest retry delay
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,
    /// Checkpoint state file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

const fn default_poll_interval() -> u64 {
    10
}

const fn default_read_timeout() -> u64 {
    60
}

const fn default_send_timeout() -> u64 {
    15
}

const fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

const fn default_true() -> bool {
    true
}

const fn default_backoff_initial() -> u64 {
    2
}

const fn default_backoff_max() -> u64 {
    300
}

impl Default for NotifierSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            read_timeout_secs: default_read_timeout(),
            send_timeout_secs: default_send_timeout(),
            first_run: FirstRun::default(),
            max_line_bytes: default_max_line_bytes(),
            colors: true,
            announce_batches: false,
            backoff_initial_secs: default_backoff_initial(),
            backoff_max_secs: default_backoff_max(),
            state_file: None,
        }
    }
}

/// One `[[repos]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoSection {
    /// Display name, also the checkpoint key
    pub name: String,
    /// Remote to clone from when the working copy is missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Working copy; defaults to a directory under the data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Branch to follow; the remote default branch when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Commit to resume after when no checkpoint is stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_commit: Option<String>,
    /// Link appended to each line; `{hash}` and `{short}` are replaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_template: Option<String>,
    /// Overrides `notifier.first_run` for this repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_run: Option<FirstRun>,
}

impl Config {
    /// Read, parse and validate the config file at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate config text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        match self.irc.server.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok_and(|p| p > 0) => {},
            _ => return invalid(format!("irc.server must be host:port, got '{}'", self.irc.server)),
        }
        if !(self.irc.channel.starts_with('#') || self.irc.channel.starts_with('&'))
            || self.irc.channel.len() < 2
            || self.irc.channel.contains([' ', ',', '\x07'])
        {
            return invalid(format!("irc.channel must look like #name, got '{}'", self.irc.channel));
        }
        if self.irc.nick.is_empty() || self.irc.nick.contains(char::is_whitespace) {
            return invalid(format!("irc.nick must be a single word, got '{}'", self.irc.nick));
        }

        let n = &self.notifier;
        if n.poll_interval_secs == 0 {
            return invalid("notifier.poll_interval_secs must be at least 1".to_string());
        }
        if n.read_timeout_secs == 0 || n.send_timeout_secs == 0 {
            return invalid("notifier timeouts must be at least 1 second".to_string());
        }
        if !(64..=510).contains(&n.max_line_bytes) {
            return invalid(format!("notifier.max_line_bytes must be 64..=510, got {}", n.max_line_bytes));
        }
        if n.backoff_initial_secs == 0 || n.backoff_max_secs < n.backoff_initial_secs {
            return invalid("notifier backoff needs 0 < backoff_initial_secs <= backoff_max_secs".to_string());
        }

        if self.repos.is_empty() {
            return invalid("at least one [[repos]] entry is required".to_string());
        }
        let mut names = HashSet::new();
        for repo in &self.repos {
            if repo.name.trim().is_empty() {
                return invalid("every repository needs a name".to_string());
            }
            if !names.insert(repo.name.as_str()) {
                return invalid(format!("repository name '{}' is used twice", repo.name));
            }
            if repo.url.is_none() && repo.path.is_none() {
                return invalid(format!("repository '{}' needs a url or a path", repo.name));
            }
        }
        Ok(())
    }

    /// Checkpoint state file, configured or default
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.notifier.state_file.clone().unwrap_or_else(paths::default_state_file)
    }

    /// Where announcements go
    #[must_use]
    pub fn target(&self) -> NotificationTarget {
        NotificationTarget::new(&self.irc.server, &self.irc.channel)
    }

    /// IRC connection settings
    #[must_use]
    pub fn irc_config(&self) -> IrcConfig {
        let mut config = IrcConfig::new(&self.irc.server, &self.irc.nick);
        if let Some(user) = &self.irc.user {
            config.user.clone_from(user);
        }
        if let Some(realname) = &self.irc.realname {
            config.realname.clone_from(realname);
        }
        config.quit_message.clone_from(&self.irc.quit_message);
        config
    }

    /// Timing settings shared by every watcher
    #[must_use]
    pub fn watcher_settings(&self) -> WatcherSettings {
        let n = &self.notifier;
        WatcherSettings {
            poll_interval: Duration::from_secs(n.poll_interval_secs),
            read_timeout: Duration::from_secs(n.read_timeout_secs),
            send_timeout: Duration::from_secs(n.send_timeout_secs),
            announce_batches: n.announce_batches,
            backoff: BackoffConfig {
                initial: Duration::from_secs(n.backoff_initial_secs),
                max: Duration::from_secs(n.backoff_max_secs),
                ..BackoffConfig::default()
            },
        }
    }
}

impl RepoSection {
    /// Working copy path, configured or default
    #[must_use]
    pub fn checkout_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| paths::repo_checkout(&self.name))
    }

    /// Options for the git commit source
    #[must_use]
    pub fn git_options(&self, notifier: &NotifierSection) -> GitSourceOptions {
        GitSourceOptions {
            url: self.url.clone(),
            path: self.checkout_path(),
            branch: self.branch.clone(),
            first_run: self.first_run.unwrap_or(notifier.first_run),
        }
    }

    /// Formatter for this repository's lines
    #[must_use]
    pub fn formatter(&self, notifier: &NotifierSection) -> MessageFormatter {
        MessageFormatter::new(&self.name)
            .with_max_line_bytes(notifier.max_line_bytes)
            .with_colors(notifier.colors)
            .with_link_template(self.link_template.clone())
    }

    /// Configured starting commit, if any
    #[must_use]
    pub fn seed(&self) -> Option<Reference> {
        self.last_seen_commit
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Reference::new)
    }
}
