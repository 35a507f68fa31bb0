//! Tests for the per-repository watcher cycle

use std::sync::Arc;
use std::time::Duration;

use combotcha::core::error::CycleError;
use combotcha::core::models::{FirstRun, Reference};
use combotcha::core::ports::{CheckpointStore, CommitSource};
use combotcha::core::services::{CycleOutcome, MessageFormatter, Phase, RepoWatcher, WatcherSettings};
use tokio::sync::{Notify, watch};

use crate::common::fixtures::{CHANNEL, Harness, REPO, commit, fast_settings, history, sha};
use crate::common::mocks::{MemoryCheckpointStore, ScriptedCommitSource};

/// Wait until `check` holds, polling briefly
async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

// =============================================================================
// DELIVERY
// =============================================================================

#[tokio::test]
async fn test_delivers_new_commits_in_order() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(3)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Delivered { count: 2 }));
    let sent = h.log.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains(&sha(2)[..8]));
    assert!(sent[1].contains(&sha(3)[..8]));
    assert_eq!(h.stored(), Some(sha(3)));
    assert_eq!(h.watcher.state().phase(), Phase::Idle);
}

#[tokio::test]
async fn test_checkpoint_at_last_commit_leaves_nothing_to_read() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(5)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );

    h.watcher.poll_once().await;
    assert_eq!(h.checkpoint(), Some(sha(5)));

    let since = Reference::new(sha(5));
    assert!(h.source.commits_since(Some(&since)).await.unwrap().commits.is_empty());
}

#[tokio::test]
async fn test_lines_go_to_configured_channel() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(2)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );

    h.watcher.poll_once().await;

    let sent = h.log.sent_to();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, CHANNEL);
    assert_eq!(sent[0].1, format!("[engine] {} Change number 2 [Ada Lovelace]", &sha(2)[..8]));
    assert_eq!(h.log.joins(), vec![CHANNEL.to_string()]);
}

#[tokio::test]
async fn test_no_new_commits_sends_nothing() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(3)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(3)),
    );

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Idle { adopted_head: None }));
    assert!(h.log.sent().is_empty());
    assert_eq!(h.stored(), Some(sha(3)));
    assert_eq!(h.store.saves(), 0);
}

#[tokio::test]
async fn test_new_commits_between_polls() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(1)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );

    h.watcher.poll_once().await;
    assert!(h.log.sent().is_empty());

    h.source.push(commit(2));
    h.source.push(commit(3));
    h.watcher.poll_once().await;

    assert_eq!(h.log.sent().len(), 2);
    assert_eq!(h.stored(), Some(sha(3)));
}

#[tokio::test]
async fn test_batch_header_precedes_commits() {
    let settings = WatcherSettings {
        announce_batches: true,
        ..fast_settings()
    };
    let mut h = Harness::with_settings(
        ScriptedCommitSource::new(history(3)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
        settings,
    );

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Delivered { count: 2 }));
    let sent = h.log.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], "engine (2 new commits)");
}

// =============================================================================
// FIRST RUN AND SEEDS
// =============================================================================

#[tokio::test]
async fn test_first_run_starts_from_head() {
    let mut h = Harness::new(ScriptedCommitSource::new(history(3)), MemoryCheckpointStore::new());

    let outcome = h.watcher.poll_once().await;

    match outcome {
        CycleOutcome::Idle { adopted_head } => assert_eq!(adopted_head, Some(Reference::new(sha(3)))),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(h.log.sent().is_empty());
    assert_eq!(h.stored(), Some(sha(3)));
}

#[tokio::test]
async fn test_first_run_replay_announces_history() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(3)).with_first_run(FirstRun::Replay),
        MemoryCheckpointStore::new(),
    );

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Delivered { count: 3 }));
    assert_eq!(h.stored(), Some(sha(3)));
}

#[tokio::test]
async fn test_first_run_on_empty_repository() {
    let mut h = Harness::new(ScriptedCommitSource::new(Vec::new()), MemoryCheckpointStore::new());

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Idle { adopted_head: None }));
    assert_eq!(h.stored(), None);
}

#[tokio::test]
async fn test_seed_is_used_when_store_is_empty() {
    let mut h = Harness::new(ScriptedCommitSource::new(history(3)), MemoryCheckpointStore::new());
    h.watcher = h.watcher.with_seed(Some(Reference::new(&sha(1)[..8])));

    h.watcher.poll_once().await;

    assert_eq!(h.log.sent().len(), 2);
    assert_eq!(h.stored(), Some(sha(3)));
}

#[tokio::test]
async fn test_stored_checkpoint_wins_over_seed() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(3)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(2)),
    );
    h.watcher = h.watcher.with_seed(Some(Reference::new(sha(1))));

    h.watcher.poll_once().await;

    assert_eq!(h.log.sent().len(), 1);
}

#[tokio::test]
async fn test_rewritten_history_moves_to_new_head() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(3)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(3)),
    );
    h.source.rewrite(vec![commit(1), commit(7)]);

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Idle { adopted_head: Some(_) }));
    assert!(h.log.sent().is_empty());
    assert_eq!(h.stored(), Some(sha(7)));
}

#[tokio::test]
async fn test_commit_landing_after_read_is_not_skipped() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(1)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );
    h.source.land_after_next_read(commit(2));

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Idle { adopted_head: None }));
    assert_eq!(h.source.head(), Some(Reference::new(sha(2))));
    assert_eq!(h.stored(), Some(sha(1)));
    assert!(h.log.sent().is_empty());

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Delivered { count: 1 }));
    assert!(h.log.sent()[0].contains(&sha(2)[..8]));
    assert_eq!(h.stored(), Some(sha(2)));
}

#[tokio::test]
async fn test_first_run_adopts_head_of_the_same_read() {
    let mut h = Harness::new(ScriptedCommitSource::new(history(2)), MemoryCheckpointStore::new());
    h.source.land_after_next_read(commit(3));

    let outcome = h.watcher.poll_once().await;

    match outcome {
        CycleOutcome::Idle { adopted_head } => assert_eq!(adopted_head, Some(Reference::new(sha(2)))),
        other => panic!("unexpected outcome: {other:?}"),
    }

    h.watcher.poll_once().await;

    assert_eq!(h.log.sent().len(), 1);
    assert!(h.log.sent()[0].contains(&sha(3)[..8]));
    assert_eq!(h.stored(), Some(sha(3)));
}

// =============================================================================
// FAILURES
// =============================================================================

#[tokio::test]
async fn test_send_failure_mid_batch() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(4)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );
    h.log.fail_send_attempt(2);

    let outcome = h.watcher.poll_once().await;

    match outcome {
        CycleOutcome::Backoff { delivered, error, .. } => {
            assert_eq!(delivered, 1);
            assert!(matches!(error, CycleError::Transport(_)));
        },
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(h.log.sent().len(), 1);
    assert_eq!(h.stored(), Some(sha(2)));
    assert_eq!(h.watcher.state().phase(), Phase::Backoff);
    assert_eq!(h.watcher.state().failures(), 1);
}

#[tokio::test]
async fn test_retry_after_send_failure_resumes() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(4)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );
    h.log.fail_send_attempt(2);

    h.watcher.poll_once().await;
    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Delivered { count: 2 }));
    let sent = h.log.sent();
    assert_eq!(sent.len(), 3);
    for (line, n) in sent.iter().zip(2..=4) {
        assert!(line.contains(&sha(n)[..8]), "{line} should announce commit {n}");
    }
    assert_eq!(h.stored(), Some(sha(4)));
    assert_eq!(h.watcher.state().failures(), 0);
    // reconnected after the failed send
    assert_eq!(h.log.connects(), 2);
    assert_eq!(h.log.joins().len(), 2);
}

#[tokio::test]
async fn test_connect_failure_backs_off_without_moving() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(2)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );
    h.log.fail_connects(1);

    let outcome = h.watcher.poll_once().await;
    assert!(matches!(outcome, CycleOutcome::Backoff { delivered: 0, .. }));
    assert_eq!(h.stored(), Some(sha(1)));

    let outcome = h.watcher.poll_once().await;
    assert!(matches!(outcome, CycleOutcome::Delivered { count: 1 }));
    assert_eq!(h.log.connects(), 1);
}

#[tokio::test]
async fn test_unavailable_repository_backs_off() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(2)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );
    h.source.set_unavailable(true);

    let first = h.watcher.poll_once().await;
    let second = h.watcher.poll_once().await;

    let (CycleOutcome::Backoff { delay: d1, error, .. }, CycleOutcome::Backoff { delay: d2, .. }) = (first, second)
    else {
        panic!("expected two backoffs");
    };
    assert!(matches!(error, CycleError::Repository(_)));
    assert!(d2 > d1);
    assert!(h.log.sent().is_empty());
    assert_eq!(h.watcher.state().failures(), 2);

    h.source.set_unavailable(false);
    let outcome = h.watcher.poll_once().await;
    assert!(matches!(outcome, CycleOutcome::Delivered { count: 1 }));
    assert_eq!(h.watcher.state().failures(), 0);
}

#[tokio::test]
async fn test_failed_save_is_retried_next_cycle() {
    let mut h = Harness::new(
        ScriptedCommitSource::new(history(2)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );
    h.store.fail_next_saves(1);

    let outcome = h.watcher.poll_once().await;

    assert!(matches!(outcome, CycleOutcome::Delivered { count: 1 }));
    assert!(h.watcher.state().unsaved());
    assert_eq!(h.checkpoint(), Some(sha(2)));
    assert_eq!(h.stored(), Some(sha(1)));

    h.watcher.poll_once().await;

    assert!(!h.watcher.state().unsaved());
    assert_eq!(h.stored(), Some(sha(2)));
    // not announced twice
    assert_eq!(h.log.sent().len(), 1);
}

// =============================================================================
// RUN LOOP
// =============================================================================

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let h = Harness::new(
        ScriptedCommitSource::new(history(3)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(h.watcher.run(rx));

    let log = h.log.clone();
    eventually(|| log.sent().len() == 2).await;

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
    assert_eq!(h.store.get(REPO), Some(Reference::new(sha(3))));
}

#[tokio::test]
async fn test_trigger_forces_early_poll() {
    let settings = WatcherSettings {
        poll_interval: Duration::from_secs(3600),
        ..fast_settings()
    };
    let h = Harness::with_settings(
        ScriptedCommitSource::new(history(1)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
        settings,
    );
    let trigger = Arc::new(Notify::new());
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(h.watcher.with_trigger(Arc::clone(&trigger)).run(rx));

    let source = Arc::clone(&h.source);
    eventually(|| source.reads() >= 1).await;
    h.source.push(commit(2));
    trigger.notify_one();

    let log = h.log.clone();
    eventually(|| log.sent().len() == 1).await;

    drop(tx);
    tokio::time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_watchers_share_one_connection() {
    let h = Harness::new(
        ScriptedCommitSource::new(history(2)),
        MemoryCheckpointStore::with_checkpoint(REPO, &sha(1)),
    );
    let other_source: Arc<dyn CommitSource> = Arc::new(ScriptedCommitSource::new(vec![commit(10), commit(11)]));
    let other_store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::with_checkpoint("docs", &sha(10)));
    let mut other = RepoWatcher::new(
        "docs",
        other_source,
        other_store,
        h.transport.clone(),
        MessageFormatter::new("docs").with_colors(false),
        fast_settings(),
    );
    let mut watcher = h.watcher;

    let (a, b) = tokio::join!(watcher.poll_once(), other.poll_once());

    assert!(matches!(a, CycleOutcome::Delivered { count: 1 }));
    assert!(matches!(b, CycleOutcome::Delivered { count: 1 }));
    let sent = h.log.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|l| l.starts_with("[engine]")));
    assert!(sent.iter().any(|l| l.starts_with("[docs]")));
    assert_eq!(h.log.connects(), 1);
}
