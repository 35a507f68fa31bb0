//! Run command - watch repositories and announce new commits

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{Notify, watch};
use tokio::task::JoinSet;

use combotcha::adapters::file::FileCheckpointStore;
use combotcha::adapters::git::GitCommitSource;
use combotcha::adapters::irc::IrcTransport;
use combotcha::config::Config;
use combotcha::core::ports::{CheckpointStore, CommitSource};
use combotcha::core::services::{RepoWatcher, SharedTransport};

/// Watch every configured repository until interrupted
pub fn run(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(serve(config));
    Ok(())
}

async fn serve(config: Config) {
    let settings = config.watcher_settings();
    let store: Arc<dyn CheckpointStore> = Arc::new(FileCheckpointStore::new(config.state_file()));
    let transport = SharedTransport::new(Box::new(IrcTransport::new(config.irc_config())), &config.irc.channel);

    log::info!("Announcing {} repositories in {}", config.repos.len(), config.target());
    if let Err(e) = transport.open(settings.send_timeout).await {
        log::warn!("Cannot reach {}, will retry on the next announcement: {e}", config.target());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let trigger = Arc::new(Notify::new());
    let mut watchers = JoinSet::new();

    for repo in &config.repos {
        let source: Arc<dyn CommitSource> = Arc::new(GitCommitSource::new(repo.git_options(&config.notifier)));
        let watcher = RepoWatcher::new(
            repo.name.clone(),
            source,
            Arc::clone(&store),
            transport.clone(),
            repo.formatter(&config.notifier),
            settings,
        )
        .with_seed(repo.seed())
        .with_trigger(Arc::clone(&trigger));
        watchers.spawn(watcher.run(shutdown_rx.clone()));
    }

    wait_for_shutdown(&trigger).await;
    log::info!("Shutting down");
    let _ = shutdown_tx.send(true);

    while let Some(joined) = watchers.join_next().await {
        if let Err(e) = joined {
            log::error!("Watcher task failed: {e}");
        }
    }
    transport.close(settings.send_timeout).await;
}

/// Wait for Ctrl-C or SIGTERM; SIGUSR1 makes every watcher poll now
#[cfg(unix)]
async fn wait_for_shutdown(trigger: &Notify) {
    use tokio::signal::unix::{SignalKind, signal};

    let (Ok(mut terminate), Ok(mut poll_now)) =
        (signal(SignalKind::terminate()), signal(SignalKind::user_defined1()))
    else {
        log::warn!("Cannot install signal handlers, only Ctrl-C stops the notifier");
        let _ = tokio::signal::ctrl_c().await;
        return;
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = terminate.recv() => break,
            _ = poll_now.recv() => {
                log::info!("Polling all repositories now");
                trigger.notify_waiters();
            },
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_trigger: &Notify) {
    let _ = tokio::signal::ctrl_c().await;
}
