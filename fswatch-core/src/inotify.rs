//! `Watcher` implementation on top of the Linux inotify API.
//!
//! inotify only watches the directories it's explicitly told about; it has
//! no notion of "recursive". Recursive mode is built on top by walking the
//! subtree at `watch()` time and registering every directory found, then
//! registering new directories as `Create` events for them arrive.

use crate::{Config, EventHandler, RecursiveMode, Watcher, WatcherKind};
use fswatch_types::{ChangeKind, Error, RawEvent, Result};
use inotify::{EventMask, Inotify, WatchDescriptor, WatchMask, Watches};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use walkdir::WalkDir;

fn watch_mask() -> WatchMask {
    WatchMask::CREATE
        | WatchMask::DELETE
        | WatchMask::DELETE_SELF
        | WatchMask::MODIFY
        | WatchMask::ATTRIB
        | WatchMask::MOVED_FROM
        | WatchMask::MOVED_TO
        | WatchMask::MOVE_SELF
        | WatchMask::CLOSE_WRITE
}

struct WatchEntry {
    path: PathBuf,
    recursive: bool,
}

type WatchMap = Arc<Mutex<HashMap<WatchDescriptor, WatchEntry>>>;

/// Native Linux backend, backed by inotify.
pub struct INotifyWatcher {
    watches: Watches,
    by_wd: WatchMap,
    by_path: Arc<Mutex<HashMap<PathBuf, WatchDescriptor>>>,
    follow_symlinks: bool,
    ignore_permission_denied: bool,
}

impl INotifyWatcher {
    fn register_one(&mut self, path: &Path, recursive: bool) -> Result<WatchDescriptor> {
        let wd = self
            .watches
            .add(path, watch_mask())
            .map_err(|e| Error::from(e).add_path(path.to_path_buf()))?;
        self.by_wd.lock().unwrap_or_else(|e| e.into_inner()).insert(
            wd.clone(),
            WatchEntry {
                path: path.to_path_buf(),
                recursive,
            },
        );
        self.by_path
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), wd.clone());
        Ok(wd)
    }

    fn run_event_loop(mut inotify: Inotify, by_wd: WatchMap, mut watches: Watches, mut handler: impl EventHandler) {
        thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            loop {
                let events = match inotify.read_events_blocking(&mut buffer) {
                    Ok(events) => events,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        handler.handle_event(Err(Error::from(e)));
                        return;
                    }
                };

                for event in events {
                    let Some(entry_path) = by_wd
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .get(&event.wd)
                        .map(|e| (e.path.clone(), e.recursive))
                    else {
                        continue;
                    };
                    let (dir, recursive) = entry_path;

                    let full_path = match &event.name {
                        Some(name) => dir.join(name),
                        None => dir.clone(),
                    };

                    if recursive
                        && event.mask.intersects(EventMask::CREATE)
                        && event.mask.intersects(EventMask::ISDIR)
                    {
                        if let Ok(wd) = watches.add(&full_path, watch_mask()) {
                            by_wd.lock().unwrap_or_else(|e| e.into_inner()).insert(
                                wd,
                                WatchEntry {
                                    path: full_path.clone(),
                                    recursive: true,
                                },
                            );
                        }
                    }

                    if let Some(kind) = classify(event.mask) {
                        handler.handle_event(Ok(RawEvent::new(kind, full_path)));
                    }
                }
            }
        });
    }
}

fn classify(mask: EventMask) -> Option<ChangeKind> {
    if mask.intersects(EventMask::CREATE | EventMask::MOVED_TO) {
        Some(ChangeKind::Added)
    } else if mask.intersects(EventMask::DELETE | EventMask::DELETE_SELF | EventMask::MOVED_FROM) {
        Some(ChangeKind::Deleted)
    } else if mask.intersects(
        EventMask::MODIFY | EventMask::ATTRIB | EventMask::CLOSE_WRITE | EventMask::MOVE_SELF,
    ) {
        Some(ChangeKind::Modified)
    } else {
        None
    }
}

impl Watcher for INotifyWatcher {
    fn new<F: EventHandler>(event_handler: F, config: Config) -> Result<Self> {
        let inotify = Inotify::init().map_err(Error::from)?;
        let watches = inotify.watches();
        let by_wd: WatchMap = Arc::new(Mutex::new(HashMap::new()));

        Self::run_event_loop(inotify, by_wd.clone(), watches.clone(), event_handler);

        Ok(INotifyWatcher {
            watches,
            by_wd,
            by_path: Arc::new(Mutex::new(HashMap::new())),
            follow_symlinks: config.follow_symlinks(),
            ignore_permission_denied: config.ignore_permission_denied(),
        })
    }

    fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> Result<()> {
        if !path.exists() {
            return Err(Error::path_not_found(path.to_path_buf()));
        }

        if path.is_dir() && recursive_mode.is_recursive() {
            for entry in WalkDir::new(path).follow_links(self.follow_symlinks) {
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
                    self.register_one(entry.path(), true)?;
                }
            }
        } else {
            self.register_one(path, recursive_mode.is_recursive())?;
        }
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        let wd = self
            .by_path
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path)
            .ok_or_else(|| Error::path_not_found(path.to_path_buf()))?;
        self.watches
            .remove(wd.clone())
            .map_err(|e| Error::from(e).add_path(path.to_path_buf()))?;
        self.by_wd.lock().unwrap_or_else(|e| e.into_inner()).remove(&wd);
        Ok(())
    }

    fn kind() -> WatcherKind {
        WatcherKind::Inotify
    }
}

impl std::fmt::Debug for INotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("INotifyWatcher").finish_non_exhaustive()
    }
}
