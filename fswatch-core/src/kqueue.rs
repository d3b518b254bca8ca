//! `Watcher` implementation on top of the BSD/macOS kqueue API.
//!
//! kqueue reports changes to the file descriptors it's given, not to a
//! directory's contents. Recursive mode is approximated the same way the
//! rest of the kqueue-based tooling does it: watch the directory itself for
//! `NOTE_WRITE`, and on that event re-list it to discover entries that
//! appeared or disappeared since the last listing.

use crate::{Config, EventHandler, RecursiveMode, Watcher, WatcherKind};
use fswatch_types::{ChangeKind, Error, RawEvent, Result};
use kqueue::{EventData, EventFilter, FilterFlag, Ident, Watcher as KqueueSys};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn note_flags() -> FilterFlag {
    FilterFlag::NOTE_WRITE
        | FilterFlag::NOTE_DELETE
        | FilterFlag::NOTE_RENAME
        | FilterFlag::NOTE_EXTEND
        | FilterFlag::NOTE_ATTRIB
        | FilterFlag::NOTE_LINK
}

enum Command {
    Watch(PathBuf, bool),
    Unwatch(PathBuf),
}

/// Native macOS/BSD backend, backed by kqueue.
pub struct KqueueWatcher {
    commands: mpsc::Sender<Command>,
    follow_symlinks: bool,
    ignore_permission_denied: bool,
}

impl KqueueWatcher {
    fn run(mut sys: KqueueSys, commands: mpsc::Receiver<Command>, mut handler: impl EventHandler) {
        thread::spawn(move || {
            let mut recursive_dirs: HashMap<PathBuf, bool> = HashMap::new();
            let mut listings: HashMap<PathBuf, HashSet<PathBuf>> = HashMap::new();

            loop {
                while let Ok(cmd) = commands.try_recv() {
                    match cmd {
                        Command::Watch(path, recursive) => {
                            if let Err(e) = sys.add_filename(&path, EventFilter::EVFILT_VNODE, note_flags()) {
                                handler.handle_event(Err(Error::from(e).add_path(path.clone())));
                                continue;
                            }
                            if path.is_dir() {
                                recursive_dirs.insert(path.clone(), recursive);
                                listings.insert(path.clone(), list_dir(&path));
                            }
                        }
                        Command::Unwatch(path) => {
                            let _ = sys.remove_filename(&path, EventFilter::EVFILT_VNODE);
                            recursive_dirs.remove(&path);
                            listings.remove(&path);
                        }
                    }
                }

                let Some(event) = sys.poll(Some(Duration::from_millis(200))) else {
                    continue;
                };

                let path = match &event.ident {
                    Ident::Filename(_, name) => PathBuf::from(name),
                    _ => continue,
                };

                let EventData::Vnode(note) = event.data else {
                    continue;
                };

                if recursive_dirs.contains_key(&path) {
                    let previous = listings.get(&path).cloned().unwrap_or_default();
                    let current = list_dir(&path);
                    let recursive = recursive_dirs[&path];

                    for added in current.difference(&previous) {
                        handler.handle_event(Ok(RawEvent::new(ChangeKind::Added, added.clone())));
                        if recursive && added.is_dir()
                            && sys.add_filename(added, EventFilter::EVFILT_VNODE, note_flags()).is_ok()
                        {
                            recursive_dirs.insert(added.clone(), true);
                            listings.insert(added.clone(), list_dir(added));
                        }
                    }
                    for removed in previous.difference(&current) {
                        handler.handle_event(Ok(RawEvent::new(ChangeKind::Deleted, removed.clone())));
                        recursive_dirs.remove(removed);
                        listings.remove(removed);
                    }
                    listings.insert(path.clone(), current);
                    continue;
                }

                if let Some(kind) = classify(note) {
                    handler.handle_event(Ok(RawEvent::new(kind, path)));
                }
            }
        });
    }
}

fn list_dir(path: &Path) -> HashSet<PathBuf> {
    fs::read_dir(path)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect()
}

fn classify(note: kqueue::Vnode) -> Option<ChangeKind> {
    use kqueue::Vnode;
    match note {
        Vnode::Delete | Vnode::Rename => Some(ChangeKind::Deleted),
        Vnode::Write | Vnode::Extend | Vnode::Attrib | Vnode::Link => Some(ChangeKind::Modified),
        _ => None,
    }
}

impl Watcher for KqueueWatcher {
    fn new<F: EventHandler>(event_handler: F, config: Config) -> Result<Self> {
        let sys = KqueueSys::new().map_err(Error::from)?;
        let (tx, rx) = mpsc::channel();
        Self::run(sys, rx, event_handler);
        Ok(KqueueWatcher {
            commands: tx,
            follow_symlinks: config.follow_symlinks(),
            ignore_permission_denied: config.ignore_permission_denied(),
        })
    }

    fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> Result<()> {
        if !path.exists() {
            return Err(Error::path_not_found(path.to_path_buf()));
        }
        if path.is_dir() && recursive_mode.is_recursive() {
            self.commands
                .send(Command::Watch(path.to_path_buf(), true))
                .map_err(|_| Error::new(fswatch_types::ErrorKind::BackendFailed))?;
            for entry in walkdir::WalkDir::new(path).follow_links(self.follow_symlinks).min_depth(1) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        let denied = e
                            .io_error()
                            .map(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
                            .unwrap_or(false);
                        if denied && self.ignore_permission_denied {
                            continue;
                        }
                        let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf());
                        return Err(if denied {
                            Error::permission_denied(path)
                        } else {
                            Error::new(fswatch_types::ErrorKind::Generic(e.to_string())).add_path(path)
                        });
                    }
                };
                if entry.file_type().is_dir() {
                    let _ = self
                        .commands
                        .send(Command::Watch(entry.path().to_path_buf(), true));
                }
            }
        } else {
            self.commands
                .send(Command::Watch(path.to_path_buf(), false))
                .map_err(|_| Error::new(fswatch_types::ErrorKind::BackendFailed))?;
        }
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.commands
            .send(Command::Unwatch(path.to_path_buf()))
            .map_err(|_| Error::new(fswatch_types::ErrorKind::BackendFailed))
    }

    fn kind() -> WatcherKind {
        WatcherKind::Kqueue
    }
}

impl std::fmt::Debug for KqueueWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KqueueWatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::fs;
    use std::time::Duration as StdDuration;

    #[test]
    fn detects_file_creation() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = unbounded::<Result<RawEvent>>();
        let mut watcher = KqueueWatcher::new(tx, Config::default()).unwrap();
        watcher.watch(dir.path(), RecursiveMode::Recursive).unwrap();

        fs::write(dir.path().join("a.txt"), b"hi").unwrap();

        let event = rx.recv_timeout(StdDuration::from_secs(2)).unwrap().unwrap();
        assert_eq!(event.kind, ChangeKind::Added);
    }
}
