//! End-to-end scenarios covering the engine's observable behavior: add,
//! modify, delete, rename-within-scope, multi-root isolation, timeout/stop
//! timing, and debounce-vs-step ordering.
//!
//! A `tests/` directory of real-filesystem integration tests,
//! `tempfile`-backed, one scenario per `#[test]`. Forces the polling
//! backend so these pass uniformly in sandboxes without a working native
//! backend (inotify/kqueue/ReadDirectoryChangesW); native backend coverage
//! lives in `fswatch-core`'s own per-backend unit tests.

use fswatch_debounce::{Outcome, StopHandle, WatchConfig, WatchSession};
use fswatch_types::ChangeKind;
use std::fs;
use std::time::Duration;

fn open(config: WatchConfig) -> WatchSession {
    WatchSession::open(config.with_force_polling(true).with_step(Duration::from_millis(20)))
        .expect("failed to open watch session")
}

#[test]
fn add_reports_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let session = open(
        WatchConfig::default()
            .with_path(dir.path())
            .with_debounce(Duration::from_millis(100))
            .with_timeout(Duration::from_secs(5)),
    );

    fs::write(dir.path().join("foo.txt"), b"hi").unwrap();

    let stop = StopHandle::new();
    let batch = match session.watch(&stop).unwrap() {
        Outcome::Changes(b) => b,
        other => panic!("expected Changes, got {other:?}"),
    };
    assert!(batch
        .iter()
        .any(|r| r.kind == ChangeKind::Added && r.path.ends_with("foo.txt")));
}

#[test]
fn modify_reports_existing_file_changed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"v1").unwrap();

    let session = open(
        WatchConfig::default()
            .with_path(dir.path())
            .with_debounce(Duration::from_millis(100))
            .with_timeout(Duration::from_secs(5)),
    );

    fs::write(&file, b"v2, longer content so mtime/content differ").unwrap();

    let stop = StopHandle::new();
    let batch = match session.watch(&stop).unwrap() {
        Outcome::Changes(b) => b,
        other => panic!("expected Changes, got {other:?}"),
    };
    assert!(batch
        .iter()
        .any(|r| r.kind == ChangeKind::Modified && r.path.ends_with("a.txt")));
}

#[test]
fn delete_reports_removed_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("c.txt");
    fs::write(&file, b"hi").unwrap();

    let session = open(
        WatchConfig::default()
            .with_path(dir.path())
            .with_debounce(Duration::from_millis(100))
            .with_timeout(Duration::from_secs(5)),
    );

    fs::remove_file(&file).unwrap();

    let stop = StopHandle::new();
    let batch = match session.watch(&stop).unwrap() {
        Outcome::Changes(b) => b,
        other => panic!("expected Changes, got {other:?}"),
    };
    assert!(batch
        .iter()
        .any(|r| r.kind == ChangeKind::Deleted && r.path.ends_with("c.txt")));
}

#[test]
fn rename_within_scope_is_delete_plus_add() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("a.txt");
    fs::write(&original, b"hi").unwrap();

    let session = open(
        WatchConfig::default()
            .with_path(dir.path())
            .with_debounce(Duration::from_millis(150))
            .with_timeout(Duration::from_secs(5)),
    );

    fs::rename(&original, dir.path().join("a.new")).unwrap();

    let stop = StopHandle::new();
    let batch = match session.watch(&stop).unwrap() {
        Outcome::Changes(b) => b,
        other => panic!("expected Changes, got {other:?}"),
    };
    assert!(batch
        .iter()
        .any(|r| r.kind == ChangeKind::Deleted && r.path.ends_with("a.txt")));
    assert!(batch
        .iter()
        .any(|r| r.kind == ChangeKind::Added && r.path.ends_with("a.new")));
}

#[test]
fn multi_root_only_reports_watched_trees() {
    let x = tempfile::tempdir().unwrap();
    let y = tempfile::tempdir().unwrap();
    let z = tempfile::tempdir().unwrap();

    let session = open(
        WatchConfig::default()
            .with_path(x.path())
            .with_path(y.path())
            .with_debounce(Duration::from_millis(150))
            .with_timeout(Duration::from_secs(5)),
    );

    fs::write(x.path().join("foo"), b"hi").unwrap();
    fs::write(y.path().join("foo"), b"hi").unwrap();
    fs::write(z.path().join("foo"), b"hi").unwrap(); // not watched

    let stop = StopHandle::new();
    let batch = match session.watch(&stop).unwrap() {
        Outcome::Changes(b) => b,
        other => panic!("expected Changes, got {other:?}"),
    };
    assert!(batch.iter().any(|r| r.path == x.path().join("foo")));
    assert!(batch.iter().any(|r| r.path == y.path().join("foo")));
    assert!(!batch.iter().any(|r| r.path.starts_with(z.path())));
}

#[test]
fn timeout_fires_around_the_requested_bound() {
    let dir = tempfile::tempdir().unwrap();
    let session = open(
        WatchConfig::default()
            .with_path(dir.path())
            .with_debounce(Duration::from_millis(20))
            .with_timeout(Duration::from_millis(50)),
    );

    let stop = StopHandle::new();
    let start = std::time::Instant::now();
    let outcome = session.watch(&stop).unwrap();
    let elapsed = start.elapsed();

    assert!(matches!(outcome, Outcome::Timeout));
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(250), "took {elapsed:?}");
}

#[test]
fn stop_event_returns_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let session = open(
        WatchConfig::default()
            .with_path(dir.path())
            .with_debounce(Duration::from_millis(20))
            .with_timeout(Duration::from_secs(5)),
    );

    let stop = StopHandle::new();
    stop.set();
    let start = std::time::Instant::now();
    let outcome = session.watch(&stop).unwrap();

    assert!(matches!(outcome, Outcome::Stop));
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn step_quiescence_fires_before_debounce_cap() {
    let dir = tempfile::tempdir().unwrap();
    let session = open(
        WatchConfig::default()
            .with_path(dir.path())
            .with_debounce(Duration::from_millis(500))
            .with_step(Duration::from_millis(50))
            .with_timeout(Duration::from_secs(5)),
    );

    fs::write(dir.path().join("debounce.txt"), b"hi").unwrap();

    let stop = StopHandle::new();
    let start = std::time::Instant::now();
    let outcome = session.watch(&stop).unwrap();
    let elapsed = start.elapsed();

    assert!(matches!(outcome, Outcome::Changes(_)));
    assert!(elapsed < Duration::from_millis(500), "step quiescence should have fired first, took {elapsed:?}");
}
