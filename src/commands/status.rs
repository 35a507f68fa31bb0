//! Status command - show stored checkpoints

use std::path::Path;

use combotcha::adapters::file::FileCheckpointStore;
use combotcha::config::Config;
use combotcha::core::ports::CheckpointStore;
use combotcha::output::{OutputMode, RepoStatus, StatusReport};

/// Show the last announced commit of every configured repository
pub fn status(config_path: &Path, output_mode: OutputMode) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let store = FileCheckpointStore::new(config.state_file());
    let mut checkpoints = store.list()?;

    let repos = config
        .repos
        .iter()
        .map(|repo| {
            let checkpoint = checkpoints
                .iter()
                .position(|c| c.repo_id == repo.name)
                .map(|i| checkpoints.swap_remove(i));
            RepoStatus {
                name: repo.name.clone(),
                source: repo
                    .url
                    .clone()
                    .unwrap_or_else(|| repo.checkout_path().display().to_string()),
                checkpoint: checkpoint.as_ref().map(|c| c.reference.to_string()),
                updated_at: checkpoint.map(|c| c.updated_at.to_rfc3339()),
            }
        })
        .collect();

    StatusReport {
        state_file: store.path().display().to_string(),
        repos,
        orphaned: checkpoints.into_iter().map(|c| c.repo_id).collect(),
    }
    .render(output_mode);
    Ok(())
}
