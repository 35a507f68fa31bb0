//! Temporary git repository helper for adapter and integration tests

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A temporary git repository for testing
pub struct TempGitRepo {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TempGitRepo {
    /// Create a new temporary git repository on branch `main`
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("upstream");
        std::fs::create_dir_all(&path).expect("Failed to create repository directory");

        let repo = Self {
            _temp_dir: temp_dir,
            path,
        };
        repo.git(&["init", "--quiet"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo.git(&["config", "user.name", "Test User"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "commit.gpgsign", "false"]);
        repo
    }

    /// Get the path to the repository
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The repository as a clone URL
    pub fn url(&self) -> String {
        self.path.display().to_string()
    }

    /// Write a file to the repository
    pub fn write_file(&self, name: &str, content: &str) {
        let file_path = self.path.join(name);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(file_path, content).expect("Failed to write file");
    }

    /// Write, stage and commit one file; returns the new commit id
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> String {
        self.write_file(name, content);
        self.git(&["add", name]);
        let output = self.git(&["commit", "--quiet", "-m", message]);
        assert!(
            output.status.success(),
            "git commit failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        self.head()
    }

    /// Commit with a specific author; returns the new commit id
    pub fn commit_as(&self, author: &str, message: &str) -> String {
        let name = format!("{}.txt", message.len());
        self.write_file(&name, message);
        self.git(&["add", &name]);
        let author = format!("{author} <{}@example.com>", author.to_lowercase().replace(' ', "."));
        self.git(&["commit", "--quiet", "--author", &author, "-m", message]);
        self.head()
    }

    /// Current HEAD commit id
    pub fn head(&self) -> String {
        let output = self.git(&["rev-parse", "HEAD"]);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Run a git command and return output
    pub fn git(&self, args: &[&str]) -> std::process::Output {
        Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .expect("Failed to run git command")
    }
}

impl Default for TempGitRepo {
    fn default() -> Self {
        Self::new()
    }
}
