//! Integration coverage for the compiled-in native backend (or, on a target
//! with none, the polling fallback `recommended_watcher` resolves to) and
//! for the full runtime Backend Selector.

use fswatch_core::selector::select_watcher;
use fswatch_core::{recommended_watcher, ChangeKind, Config, RawEvent, RecursiveMode, Result, Watcher};
use std::fs;
use std::sync::mpsc::channel;
use std::time::Duration;

fn recv_one(rx: &std::sync::mpsc::Receiver<Result<RawEvent>>) -> RawEvent {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("event channel closed before an event arrived")
        .expect("backend reported an error instead of an event")
}

#[test]
fn recommended_watcher_detects_file_creation() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = channel();
    let mut watcher = recommended_watcher(tx).unwrap();
    watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap();

    fs::write(dir.path().join("new.txt"), b"hello").unwrap();

    let event = recv_one(&rx);
    assert_eq!(event.kind, ChangeKind::Added);
    assert_eq!(event.path, dir.path().join("new.txt"));
}

#[test]
fn recommended_watcher_detects_modification() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("existing.txt");
    fs::write(&file, b"v1").unwrap();

    let (tx, rx) = channel();
    let mut watcher = recommended_watcher(tx).unwrap();
    watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap();

    fs::write(&file, b"v2").unwrap();

    let event = recv_one(&rx);
    assert_ne!(event.kind, ChangeKind::Deleted);
}

#[test]
fn recommended_watcher_detects_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("doomed.txt");
    fs::write(&file, b"v1").unwrap();

    let (tx, rx) = channel();
    let mut watcher = recommended_watcher(tx).unwrap();
    watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap();

    fs::remove_file(&file).unwrap();

    let event = recv_one(&rx);
    assert_eq!(event.kind, ChangeKind::Deleted);
    assert_eq!(event.path, file);
}

#[test]
fn non_recursive_watch_ignores_nested_directory_changes() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();

    let (tx, rx) = channel();
    let mut watcher = recommended_watcher(tx).unwrap();
    watcher.watch(dir.path(), RecursiveMode::NonRecursive).unwrap();

    fs::write(nested.join("deep.txt"), b"hi").unwrap();
    fs::write(dir.path().join("shallow.txt"), b"hi").unwrap();

    let event = recv_one(&rx);
    assert_eq!(event.path, dir.path().join("shallow.txt"));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn select_watcher_forced_polling_still_detects_changes() {
    std::env::set_var("WATCHFILES_FORCE_POLLING", "1");
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = channel();
    let config = Config::default().with_poll_interval(Duration::from_millis(30));
    let mut selected = select_watcher(tx, config).unwrap();
    assert_eq!(selected.kind(), fswatch_core::WatcherKind::PollWatcher);
    selected.watch(dir.path(), RecursiveMode::Recursive).unwrap();

    fs::write(dir.path().join("new.txt"), b"hi").unwrap();

    let event = recv_one(&rx);
    assert_eq!(event.kind, ChangeKind::Added);
    std::env::remove_var("WATCHFILES_FORCE_POLLING");
}

#[test]
fn unwatch_stops_further_delivery() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = channel();
    let mut watcher = recommended_watcher(tx).unwrap();
    watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap();
    watcher.unwatch(dir.path()).unwrap();

    fs::write(dir.path().join("after-unwatch.txt"), b"hi").unwrap();

    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}
