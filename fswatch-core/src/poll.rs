//! Polling-based `Watcher`: walks each watched root on a
//! fixed interval and diffs an mtime map against the previous scan. Works
//! on every platform and is the Backend Selector's universal fallback.

use crate::{Config, EventHandler, RecursiveMode, Watcher, WatcherKind};
use filetime::FileTime;
use fswatch_types::{ChangeKind, Error, RawEvent, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;
use walkdir::WalkDir;

struct Root {
    recursive: bool,
}

/// A file's fingerprint between two scans. Plain mtime fingerprints carry
/// both the seconds-resolution modification time and the file's length: the
/// mtime alone aliases a same-second edit (write, register baseline, write
/// again, all inside one wall-clock second) onto the same value, and the
/// length catches what the timestamp alone would miss. `compare_contents`
/// mode hashes the file instead and ignores the timestamp entirely.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Fingerprint {
    MTime { seconds: i64, len: u64 },
    Contents(u64),
}

struct Shared {
    roots: Mutex<HashMap<PathBuf, Root>>,
    mtimes: Mutex<HashMap<PathBuf, Fingerprint>>,
    running: RwLock<bool>,
    compare_contents: bool,
    follow_symlinks: bool,
    ignore_permission_denied: bool,
}

fn mtime_fingerprint(metadata: &fs::Metadata) -> Fingerprint {
    Fingerprint::MTime {
        seconds: FileTime::from_last_modification_time(metadata).seconds(),
        len: metadata.len(),
    }
}

/// Polling `Watcher` implementation. Rescans every watched root at
/// `Config::poll_interval` and reports entries whose mtime advanced since
/// the previous scan as `Modified`, new entries as `Added`, and entries
/// that vanished as `Deleted`.
pub struct PollWatcher {
    shared: Arc<Shared>,
}

impl PollWatcher {
    /// Walk `root`, returning every reachable file's `(path, fingerprint)`.
    /// A subtree entry that can't be read surfaces as the second element
    /// (the *first* such failure only) unless `ignore_permission_denied`
    /// elides it, per the spec's per-subtree traversal-failure rule; either
    /// way the walk keeps going; one bad entry never aborts the scan.
    fn scan_root(
        root: &Path,
        recursive: bool,
        compare_contents: bool,
        follow_symlinks: bool,
        ignore_permission_denied: bool,
    ) -> (Vec<(PathBuf, Fingerprint)>, Option<Error>) {
        let depth = if recursive { usize::MAX } else { 1 };
        let mut out = Vec::new();
        let mut first_error = None;
        for entry in WalkDir::new(root).follow_links(follow_symlinks).max_depth(depth) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let is_permission_denied = e
                        .io_error()
                        .map(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
                        .unwrap_or(false);
                    if !is_permission_denied || !ignore_permission_denied {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                        first_error.get_or_insert_with(|| {
                            let kind = if is_permission_denied {
                                fswatch_types::ErrorKind::PermissionDenied
                            } else {
                                fswatch_types::ErrorKind::Generic(e.to_string())
                            };
                            Error::new(kind).add_path(path)
                        });
                    }
                    continue;
                }
            };
            let path = entry.path().to_path_buf();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_dir() {
                continue;
            }
            let fingerprint = if compare_contents {
                Fingerprint::Contents(fs::read(&path).map(fingerprint_bytes).unwrap_or(0))
            } else {
                mtime_fingerprint(&metadata)
            };
            out.push((path, fingerprint));
        }
        (out, first_error)
    }

    fn run(shared: Arc<Shared>, interval: Duration, compare_contents: bool, mut handler: impl EventHandler) {
        thread::spawn(move || loop {
            if !*shared.running.read().unwrap_or_else(|e| e.into_inner()) {
                return;
            }
            thread::sleep(interval);
            if !*shared.running.read().unwrap_or_else(|e| e.into_inner()) {
                return;
            }

            let roots: Vec<(PathBuf, bool)> = shared
                .roots
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .map(|(p, r)| (p.clone(), r.recursive))
                .collect();

            let mut seen = std::collections::HashSet::new();
            for (root, recursive) in roots {
                let metadata = match fs::symlink_metadata(&root) {
                    Ok(m) => m,
                    Err(e) => {
                        handler.handle_event(Err(Error::from(e).add_path(root)));
                        continue;
                    }
                };
                let entries = if metadata.is_dir() {
                    let (entries, error) = Self::scan_root(
                        &root,
                        recursive,
                        compare_contents,
                        shared.follow_symlinks,
                        shared.ignore_permission_denied,
                    );
                    if let Some(e) = error {
                        handler.handle_event(Err(e));
                    }
                    entries
                } else {
                    vec![(root.clone(), mtime_fingerprint(&metadata))]
                };

                let mut mtimes = shared.mtimes.lock().unwrap_or_else(|e| e.into_inner());
                for (path, fingerprint) in entries {
                    seen.insert(path.clone());
                    match mtimes.insert(path.clone(), fingerprint) {
                        None => handler.handle_event(Ok(RawEvent::new(ChangeKind::Added, path))),
                        Some(old) if old != fingerprint => {
                            handler.handle_event(Ok(RawEvent::new(ChangeKind::Modified, path)))
                        }
                        Some(_) => {}
                    }
                }
            }

            let mut mtimes = shared.mtimes.lock().unwrap_or_else(|e| e.into_inner());
            let gone: Vec<PathBuf> = mtimes
                .keys()
                .filter(|p| !seen.contains(*p))
                .cloned()
                .collect();
            for path in gone {
                mtimes.remove(&path);
                handler.handle_event(Ok(RawEvent::new(ChangeKind::Deleted, path)));
            }
        });
    }
}

fn fingerprint_bytes(bytes: Vec<u8>) -> u64 {
    // Cheap rolling hash; content comparison only needs stability across
    // scans, not collision resistance.
    bytes
        .iter()
        .fold(0xcbf29ce484222325u64, |h, &b| (h ^ b as u64).wrapping_mul(0x100000001b3))
}

impl Watcher for PollWatcher {
    fn new<F: EventHandler>(event_handler: F, config: Config) -> Result<Self> {
        let shared = Arc::new(Shared {
            roots: Mutex::new(HashMap::new()),
            mtimes: Mutex::new(HashMap::new()),
            running: RwLock::new(true),
            compare_contents: config.compare_contents(),
            follow_symlinks: config.follow_symlinks(),
            ignore_permission_denied: config.ignore_permission_denied(),
        });
        Self::run(shared.clone(), config.poll_interval(), config.compare_contents(), event_handler);
        Ok(PollWatcher { shared })
    }

    fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> Result<()> {
        let metadata = fs::symlink_metadata(path).map_err(|_| Error::path_not_found(path.to_path_buf()))?;
        let recursive = recursive_mode.is_recursive();

        // Establish the baseline synchronously, before the root is visible to
        // the background loop, so anything present at registration time is
        // never reported as Added.
        let entries = if metadata.is_dir() {
            let (entries, error) = Self::scan_root(
                path,
                recursive,
                self.shared.compare_contents,
                self.shared.follow_symlinks,
                self.shared.ignore_permission_denied,
            );
            if let Some(e) = error {
                return Err(e);
            }
            entries
        } else {
            vec![(path.to_path_buf(), mtime_fingerprint(&metadata))]
        };

        // Hold the roots lock across the mtimes insert so a background tick
        // can never observe the baseline mtimes without the root also being
        // present in `roots` (or vice versa) — either ordering on its own
        // lets a concurrent tick either miss the new root's entries in
        // `seen` (spurious Deleted) or see them as freshly-added (spurious
        // Added) depending on which half of the update it catches.
        let mut roots = self.shared.roots.lock().unwrap_or_else(|e| e.into_inner());
        {
            let mut mtimes = self.shared.mtimes.lock().unwrap_or_else(|e| e.into_inner());
            for (p, fingerprint) in entries {
                mtimes.insert(p, fingerprint);
            }
        }
        roots.insert(path.to_path_buf(), Root { recursive });
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.shared
            .roots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
        self.shared
            .mtimes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn kind() -> WatcherKind {
        WatcherKind::PollWatcher
    }
}

impl Drop for PollWatcher {
    fn drop(&mut self) {
        *self.shared.running.write().unwrap_or_else(|e| e.into_inner()) = false;
    }
}

impl std::fmt::Debug for PollWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollWatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::fs;
    use std::time::Duration as StdDuration;

    #[test]
    fn detects_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = unbounded::<Result<RawEvent>>();
        let config = Config::default().with_poll_interval(StdDuration::from_millis(30));
        let mut watcher = PollWatcher::new(tx, config).unwrap();
        watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap();

        fs::write(dir.path().join("new.txt"), b"hi").unwrap();

        let event = rx.recv_timeout(StdDuration::from_secs(2)).unwrap().unwrap();
        assert_eq!(event.kind, ChangeKind::Added);
    }

    #[test]
    fn detects_deleted_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gone.txt");
        fs::write(&file, b"hi").unwrap();

        let (tx, rx) = unbounded::<Result<RawEvent>>();
        let config = Config::default().with_poll_interval(StdDuration::from_millis(30));
        let mut watcher = PollWatcher::new(tx, config).unwrap();
        // the baseline scan happens inside watch() itself, so the
        // pre-existing file is never reported as Added.
        watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap();

        fs::remove_file(&file).unwrap();
        let event = rx.recv_timeout(StdDuration::from_secs(2)).unwrap().unwrap();
        assert_eq!(event.kind, ChangeKind::Deleted);
    }

    #[test]
    #[cfg(unix)]
    fn permission_denied_subtree_fails_watch_unless_ignored() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("secret.txt"), b"hi").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root (and some CI sandboxes) bypass directory permission bits
        // entirely; skip rather than assert a denial that can't happen here.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let (tx, _rx) = unbounded::<Result<RawEvent>>();
        let config = Config::default().with_poll_interval(StdDuration::from_millis(30));
        let mut watcher = PollWatcher::new(tx, config).unwrap();
        let err = watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap_err();
        assert!(matches!(err.kind, fswatch_types::ErrorKind::PermissionDenied));

        let (tx2, _rx2) = unbounded::<Result<RawEvent>>();
        let config2 = Config::default()
            .with_poll_interval(StdDuration::from_millis(30))
            .with_ignore_permission_denied(true);
        let mut watcher2 = PollWatcher::new(tx2, config2).unwrap();
        let result = watcher2.watch(dir.path(), RecursiveMode::Recursive);

        // restore so tempdir cleanup can remove it
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn fingerprint_differs_on_same_second_when_size_changes() {
        // A file rewritten within the same wall-clock second keeps the same
        // seconds-resolution mtime; the size must still distinguish it so
        // the scan doesn't mistake the edit for no change at all.
        let a = Fingerprint::MTime { seconds: 1_000, len: 2 };
        let b = Fingerprint::MTime { seconds: 1_000, len: 42 };
        assert_ne!(a, b);
    }

    #[test]
    #[cfg(unix)]
    fn follow_symlinks_false_skips_symlinked_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("inside.txt"), b"hi").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let (entries, _) = PollWatcher::scan_root(dir.path(), true, false, false, false);
        assert!(!entries.iter().any(|(p, _)| p.starts_with(&link)));
    }

    #[test]
    fn unwatch_does_not_leave_stale_entries_reported_as_deleted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stays.txt"), b"hi").unwrap();

        let (tx, rx) = unbounded::<Result<RawEvent>>();
        let config = Config::default().with_poll_interval(StdDuration::from_millis(30));
        let mut watcher = PollWatcher::new(tx, config).unwrap();
        watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap();
        watcher.unwatch(dir.path()).unwrap();

        // the file was never removed from disk and the root is no longer
        // watched, so no Deleted event should ever arrive for it.
        assert!(rx.recv_timeout(StdDuration::from_millis(200)).is_err());
    }
}
