//! The Backend Selector: decides between a native watcher and
//! [`PollWatcher`] at runtime, honoring `WATCHFILES_FORCE_POLLING`,
//! automatic WSL detection, and falling back to polling if constructing
//! the native backend fails.

use crate::{Config, EventHandler, RecursiveMode, Result, Watcher, WatcherKind};
use std::env;
use std::path::Path;

/// The truth table shared by `WATCHFILES_FORCE_POLLING` and
/// `WATCHFILES_IGNORE_PERMISSION_DENIED`: empty or absent is falsy, the
/// words `false`/`disable`/`disabled` (case-insensitive) are an explicit
/// falsy override, and any other non-empty value is truthy. This is wider
/// than a conventional boolean-env-var allowlist on purpose — it's the
/// original project's own rule, carried over verbatim.
fn env_is_truthy(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    !matches!(value.to_ascii_lowercase().as_str(), "false" | "disable" | "disabled")
}

/// Whether `WATCHFILES_FORCE_POLLING` is set to a truthy value.
pub fn force_polling_requested() -> bool {
    env::var("WATCHFILES_FORCE_POLLING")
        .map(|v| env_is_truthy(&v))
        .unwrap_or(false)
}

/// The poll interval requested via `WATCHFILES_POLL_DELAY_MS`, if any.
pub fn poll_delay_override() -> Option<std::time::Duration> {
    env::var("WATCHFILES_POLL_DELAY_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(std::time::Duration::from_millis)
}

/// Whether `WATCHFILES_IGNORE_PERMISSION_DENIED` is set to a truthy value.
pub fn ignore_permission_denied_requested() -> bool {
    env::var("WATCHFILES_IGNORE_PERMISSION_DENIED")
        .map(|v| env_is_truthy(&v))
        .unwrap_or(false)
}

/// Detect whether we're running under the Windows Subsystem for Linux.
///
/// WSL1's filesystem layer doesn't deliver inotify events for changes made
/// from the Windows side, so native mode is unreliable there; WSL2 is
/// generally fine, but the kernel release string is the only portable
/// signal available without shelling out. Looks for the substring
/// `"microsoft-standard"` in `/proc/sys/kernel/osrelease`.
pub fn running_under_wsl() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .map(|release| release.to_ascii_lowercase().contains("microsoft-standard"))
            .unwrap_or(false)
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// True if runtime conditions (env var or WSL detection) should force the
/// polling backend regardless of what's compiled in.
pub fn should_force_polling() -> bool {
    force_polling_requested() || running_under_wsl()
}

/// A watcher selected by [`select_watcher`], tagged with which backend it
/// ended up being so callers can log or branch on it without downcasting.
pub struct SelectedWatcher {
    inner: Box<dyn BackendWatcher>,
    kind: WatcherKind,
}

impl SelectedWatcher {
    /// Which backend this is.
    pub fn kind(&self) -> WatcherKind {
        self.kind
    }

    /// Start watching a path.
    pub fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> Result<()> {
        self.inner.watch(path, recursive_mode)
    }

    /// Stop watching a path.
    pub fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.inner.unwatch(path)
    }
}

/// Object-safe facade over a concrete [`Watcher`] so
/// [`select_watcher`] can return one of several backend types uniformly.
trait BackendWatcher: Send {
    fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> Result<()>;
    fn unwatch(&mut self, path: &Path) -> Result<()>;
}

impl<W: Watcher + Send> BackendWatcher for W {
    fn watch(&mut self, path: &Path, recursive_mode: RecursiveMode) -> Result<()> {
        Watcher::watch(self, path, recursive_mode)
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        Watcher::unwatch(self, path)
    }
}

/// Whether a native backend is compiled in for this target at all. This is
/// a compile-time fact, not a runtime probe, so it can be checked before
/// `handler` is consumed by an actual construction attempt.
const fn native_available() -> bool {
    cfg!(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonflybsd",
        target_os = "macos",
        target_os = "windows",
    ))
}

fn new_native<F: EventHandler>(handler: F, config: Config) -> Result<(Box<dyn BackendWatcher>, WatcherKind)> {
    #[cfg(target_os = "linux")]
    {
        let w = crate::inotify::INotifyWatcher::new(handler, config)?;
        return Ok((Box::new(w), WatcherKind::Inotify));
    }
    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonflybsd",
        target_os = "macos",
    ))]
    {
        let w = crate::kqueue::KqueueWatcher::new(handler, config)?;
        return Ok((Box::new(w), WatcherKind::Kqueue));
    }
    #[cfg(target_os = "windows")]
    {
        let w = crate::windows::ReadDirectoryChangesWatcher::new(handler, config)?;
        return Ok((Box::new(w), WatcherKind::ReadDirectoryChangesWatcher));
    }
    #[allow(unreachable_code)]
    {
        let _ = (handler, config);
        unreachable!("new_native is only called when native_available() is true")
    }
}

/// Build the watcher to actually use for this process: applies
/// `WATCHFILES_FORCE_POLLING`/WSL detection first, then uses the native
/// backend if one is compiled in for this target, falling back to
/// [`crate::PollWatcher`] only when none is. A native backend that's
/// compiled in but fails to construct (e.g. the platform's watch-handle
/// limit is exhausted) surfaces that error directly: recovering `handler`
/// to retry with `PollWatcher` would require `F: Clone`, which most
/// callers' closures don't provide.
pub fn select_watcher<F: EventHandler>(handler: F, mut config: Config) -> Result<SelectedWatcher> {
    if config.poll_interval() == Config::default().poll_interval() {
        if let Some(delay) = poll_delay_override() {
            config = config.with_poll_interval(delay);
        }
    }
    if ignore_permission_denied_requested() {
        config = config.with_ignore_permission_denied(true);
    }

    if should_force_polling() || !native_available() {
        log::info!("backend selector: using polling backend");
        let w = crate::PollWatcher::new(handler, config)?;
        return Ok(SelectedWatcher {
            inner: Box::new(w),
            kind: WatcherKind::PollWatcher,
        });
    }

    let (inner, kind) = new_native(handler, config)?;
    log::debug!("backend selector: using native backend {:?}", kind);
    Ok(SelectedWatcher { inner, kind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values_recognized() {
        for v in ["1", "true", "TRUE", "yes", "on", "xyz"] {
            assert!(env_is_truthy(v), "{v} should be truthy");
        }
        for v in ["false", "FALSE", "disable", "Disabled", ""] {
            assert!(!env_is_truthy(v), "{v} should not be truthy");
        }
    }
}
