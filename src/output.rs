//! Output formatting for human and JSON modes
//!
//! This module provides structured output that can be rendered either as
//! human-readable text or machine-parseable JSON.

use serde::Serialize;

/// Output mode for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output (machine-readable)
    Json,
}

/// Stored checkpoints of the configured repositories
#[derive(Debug, Serialize)]
pub struct StatusReport {
    /// Checkpoint state file that was read
    pub state_file: String,
    /// One entry per configured repository
    pub repos: Vec<RepoStatus>,
    /// Checkpoints stored for repositories no longer configured
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub orphaned: Vec<String>,
}

/// Checkpoint of one repository
#[derive(Debug, Serialize)]
pub struct RepoStatus {
    /// Repository name
    pub name: String,
    /// Where commits are read from (url or path)
    pub source: String,
    /// Last announced commit
    pub checkpoint: Option<String>,
    /// When the checkpoint last moved (RFC3339)
    pub updated_at: Option<String>,
}

/// Summary of a validated config file
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    /// Config file path
    pub path: String,
    /// IRC server
    pub server: String,
    /// Channel announced in
    pub channel: String,
    /// Nickname
    pub nick: String,
    /// Seconds between polls
    pub poll_interval_secs: u64,
    /// First-run policy
    pub first_run: String,
    /// Checkpoint state file
    pub state_file: String,
    /// Repository names
    pub repos: Vec<String>,
}

impl StatusReport {
    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => print!("{}", self.to_human()),
            OutputMode::Json => {
                println!("{}", serde_json::to_string_pretty(self).unwrap_or_default());
            },
        }
    }

    /// Human-readable rendering
    #[must_use]
    pub fn to_human(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "State file: {}\n", self.state_file);
        for repo in &self.repos {
            let _ = writeln!(out, "{} ({})", repo.name, repo.source);
            match (&repo.checkpoint, &repo.updated_at) {
                (Some(checkpoint), Some(at)) => {
                    let _ = writeln!(out, "  last announced: {checkpoint} at {at}");
                },
                (Some(checkpoint), None) => {
                    let _ = writeln!(out, "  last announced: {checkpoint}");
                },
                _ => {
                    let _ = writeln!(out, "  last announced: never");
                },
            }
        }
        if !self.orphaned.is_empty() {
            let _ = writeln!(out, "\nCheckpoints without a configured repository: {}", self.orphaned.join(", "));
        }
        out
    }
}

impl ConfigSummary {
    /// Render the result based on output mode
    pub fn render(&self, mode: OutputMode) {
        match mode {
            OutputMode::Human => {
                println!("Config OK: {}", self.path);
                println!("  irc:      {} {} as {}", self.server, self.channel, self.nick);
                println!("  polling:  every {}s, first run: {}", self.poll_interval_secs, self.first_run);
                println!("  state:    {}", self.state_file);
                println!("  repos:    {}", self.repos.join(", "));
            },
            OutputMode::Json => {
                println!("{}", serde_json::to_string_pretty(self).unwrap_or_default());
            },
        }
    }
}
