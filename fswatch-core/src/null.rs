//! Stub `Watcher` implementation used by tests.

#![allow(unused_variables)]

use crate::{Config, RecursiveMode, Result, Watcher, WatcherKind};
use std::path::Path;

/// A `Watcher` that never delivers events. Useful as a default when a
/// caller wants the trait surface without a real backend.
#[derive(Debug)]
pub struct NullWatcher;

impl Watcher for NullWatcher {
    fn new<F: crate::EventHandler>(_event_handler: F, _config: Config) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(NullWatcher)
    }

    fn watch(&mut self, _path: &Path, _recursive_mode: RecursiveMode) -> Result<()> {
        Ok(())
    }

    fn unwatch(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn configure(&mut self, _config: Config) -> Result<bool> {
        Ok(false)
    }

    fn kind() -> WatcherKind {
        WatcherKind::NullWatcher
    }
}
