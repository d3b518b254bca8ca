//! Cross-platform filesystem watching: native backends plus a polling
//! fallback, selected automatically for the running platform.
//!
//! ```toml
//! [dependencies]
//! fswatch-core = "0.1"
//! ```
//!
//! ## Backends
//!
//! - `inotify` on Linux
//! - `kqueue` on macOS, FreeBSD, OpenBSD, NetBSD and DragonFly BSD
//! - `ReadDirectoryChangesW` on Windows
//! - [`PollWatcher`](poll::PollWatcher) everywhere, as a fallback when no
//!   native backend is available or one is not wanted (see
//!   `WATCHFILES_FORCE_POLLING` below)
//!
//! [`recommended_watcher`] picks the native backend for the compiled
//! platform; [`select_watcher`] additionally applies the runtime fallback
//! rules a long-running process needs (forced polling, WSL detection,
//! native construction failure).
//!
//! ### Crossbeam-channel & Tokio
//!
//! By default `crossbeam-channel` is used internally. This can
//! [cause issues](https://github.com/notify-rs/notify/issues/380) inside a
//! tokio runtime; disable the `crossbeam-channel` feature to fall back to
//! `std::sync::mpsc`.
//!
//! ### Pseudo filesystems like /proc, /sys
//!
//! These do not reliably emit change events or maintain correct
//! modification times. Use [`PollWatcher`](poll::PollWatcher) with content
//! comparison enabled to work around it.
//!
//! ### Linux: no space left on device / bad file descriptor
//!
//! This usually means the inotify watch limit has been hit:
//!
//! ```sh
//! sudo sysctl fs.inotify.max_user_instances=8192
//! sudo sysctl fs.inotify.max_user_watches=524288
//! ```

#![deny(missing_docs)]

pub use config::{Config, RecursiveMode};
pub use fswatch_types::{ChangeKind, Error, ErrorKind, RawEvent, Result};
use std::path::Path;

#[allow(dead_code)]
#[cfg(feature = "crossbeam-channel")]
pub(crate) type Receiver<T> = crossbeam_channel::Receiver<T>;
#[allow(dead_code)]
#[cfg(not(feature = "crossbeam-channel"))]
pub(crate) type Receiver<T> = std::sync::mpsc::Receiver<T>;

#[allow(dead_code)]
#[cfg(feature = "crossbeam-channel")]
pub(crate) type Sender<T> = crossbeam_channel::Sender<T>;
#[allow(dead_code)]
#[cfg(not(feature = "crossbeam-channel"))]
pub(crate) type Sender<T> = std::sync::mpsc::Sender<T>;

#[allow(dead_code)]
#[inline]
pub(crate) fn unbounded<T>() -> (Sender<T>, Receiver<T>) {
    #[cfg(feature = "crossbeam-channel")]
    return crossbeam_channel::unbounded();
    #[cfg(not(feature = "crossbeam-channel"))]
    return std::sync::mpsc::channel();
}

#[cfg(target_os = "linux")]
pub use crate::inotify::INotifyWatcher;
#[cfg(any(
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonflybsd",
    target_os = "macos",
))]
pub use crate::kqueue::KqueueWatcher;
pub use null::NullWatcher;
pub use poll::PollWatcher;
#[cfg(target_os = "windows")]
pub use windows::ReadDirectoryChangesWatcher;

#[cfg(target_os = "linux")]
pub mod inotify;
#[cfg(any(
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonflybsd",
    target_os = "netbsd",
    target_os = "macos",
))]
pub mod kqueue;
#[cfg(target_os = "windows")]
pub mod windows;

pub mod channel;
pub mod debug_sink;
pub mod null;
pub mod poll;
pub mod selector;

pub use debug_sink::TracingEventHandler;

mod config;

/// The set of requirements for watcher event handling functions.
///
/// # Example implementation
///
/// ```no_run
/// use fswatch_core::{RawEvent, Result, EventHandler};
///
/// struct EventPrinter;
///
/// impl EventHandler for EventPrinter {
///     fn handle_event(&mut self, event: Result<RawEvent>) {
///         if let Ok(event) = event {
///             println!("event: {:?}", event);
///         }
///     }
/// }
/// ```
pub trait EventHandler: Send + 'static {
    /// Handles an event, or the error that replaced it.
    fn handle_event(&mut self, event: Result<RawEvent>);
}

impl<F> EventHandler for F
where
    F: FnMut(Result<RawEvent>) + Send + 'static,
{
    fn handle_event(&mut self, event: Result<RawEvent>) {
        (self)(event);
    }
}

#[cfg(feature = "crossbeam-channel")]
impl EventHandler for crossbeam_channel::Sender<Result<RawEvent>> {
    fn handle_event(&mut self, event: Result<RawEvent>) {
        let _ = self.send(event);
    }
}

impl EventHandler for std::sync::mpsc::Sender<Result<RawEvent>> {
    fn handle_event(&mut self, event: Result<RawEvent>) {
        let _ = self.send(event);
    }
}

/// Which concrete implementation is backing a [`Watcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum WatcherKind {
    /// inotify backend (Linux)
    Inotify,
    /// kqueue backend (BSD family, macOS)
    Kqueue,
    /// Polling based backend (fallback)
    PollWatcher,
    /// Windows backend
    ReadDirectoryChangesWatcher,
    /// Fake watcher for testing
    NullWatcher,
}

/// A type that can deliver filesystem activity notifications.
///
/// Implemented once per platform backend; the polling implementation works
/// everywhere. Consumers normally go through [`recommended_watcher`] or
/// [`selector::select_watcher`] rather than naming a concrete type.
pub trait Watcher {
    /// Create a new watcher with an initial [`Config`].
    fn new<F: EventHandler>(event_handler: F, config: Config) -> Result<Self>
    where
        Self: Sized;

    /// Begin watching a new path.
    ///
    /// If `path` is a directory, `recursive_mode` is honored: `Recursive`
    /// delivers events for the whole subtree, including directories created
    /// after the watch is installed; `NonRecursive` only watches the
    /// directory itself and its immediate children.
    ///
    /// If `path` is a file, `recursive_mode` is ignored.
    fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> Result<()>;

    /// Stop watching a path.
    fn unwatch(&mut self, path: &Path) -> Result<()>;

    /// Reconfigure the watcher at runtime.
    ///
    /// Returns `Ok(true)` on success, `Ok(false)` if this backend does not
    /// support the requested option.
    fn configure(&mut self, _option: Config) -> Result<bool> {
        Ok(false)
    }

    /// The kind of backend this is, for diagnostics and tests.
    fn kind() -> WatcherKind
    where
        Self: Sized;
}

/// The native `Watcher` implementation for the current platform, selected
/// at compile time. This is not the full Backend Selector: it never falls
/// back to polling at runtime. Use [`selector::select_watcher`] for that.
#[cfg(target_os = "linux")]
pub type RecommendedWatcher = INotifyWatcher;
/// The native `Watcher` implementation for the current platform.
#[cfg(target_os = "windows")]
pub type RecommendedWatcher = ReadDirectoryChangesWatcher;
/// The native `Watcher` implementation for the current platform.
#[cfg(any(
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonflybsd",
    target_os = "macos",
))]
pub type RecommendedWatcher = KqueueWatcher;
/// The native `Watcher` implementation for the current platform.
#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "windows",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonflybsd"
)))]
pub type RecommendedWatcher = PollWatcher;

/// Construct the `RecommendedWatcher` for the current platform.
///
/// This is the compile-time choice only; it does not apply
/// `WATCHFILES_FORCE_POLLING` or WSL detection. See
/// [`selector::select_watcher`] for the full Backend Selector.
pub fn recommended_watcher<F>(event_handler: F) -> Result<RecommendedWatcher>
where
    F: EventHandler,
{
    RecommendedWatcher::new(event_handler, Config::default())
}
