//! [`WatchConfig`]: what to watch and how to debounce it.

use fswatch_core::RecursiveMode;
use fswatch_types::ChangeKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// A consumer-supplied predicate deciding whether a change survives into a
/// delivered batch. Cheap to clone: sessions share one
/// `Arc` rather than cloning a closure's captures.
pub type FilterPredicate = Arc<dyn Fn(ChangeKind, &Path) -> bool + Send + Sync>;

/// One root to watch, with its recursion mode.
#[derive(Clone, Debug)]
pub struct WatchRoot {
    pub(crate) path: PathBuf,
    pub(crate) recursive_mode: RecursiveMode,
}

/// Configuration for one [`crate::WatchSession`].
///
/// Mirrors the parameters the debounce loop takes directly
/// (`debounce_ms`, `step_ms`, `timeout_ms`) plus the session-scoped options
/// that apply to every call to [`crate::Debouncer::watch`] on it.
#[derive(Clone, Debug)]
pub struct WatchConfig {
    pub(crate) roots: Vec<WatchRoot>,
    pub(crate) debounce: Duration,
    pub(crate) step: Duration,
    pub(crate) timeout: Duration,
    pub(crate) ignore_permission_denied: bool,
    pub(crate) force_polling: bool,
    pub(crate) channel_capacity: usize,
    pub(crate) filter: Option<FilterPredicate>,
    pub(crate) debug: bool,
    pub(crate) poll_delay: Option<Duration>,
}

/// Default debounce quiescence window, matching the wrapped project's own
/// default.
pub const DEFAULT_DEBOUNCE_MS: u64 = 1_600;
/// Default step between stop-event checks while waiting.
pub const DEFAULT_STEP_MS: u64 = 50;
/// Default overall `watch()` timeout on Windows, where long-lived polling
/// loops without a periodic wakeup interact poorly with console signal
/// delivery.
pub const DEFAULT_TIMEOUT_MS_WINDOWS: u64 = 1_000;
/// Default overall `watch()` timeout everywhere else.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

fn default_timeout() -> Duration {
    #[cfg(target_os = "windows")]
    {
        Duration::from_millis(DEFAULT_TIMEOUT_MS_WINDOWS)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Duration::from_millis(DEFAULT_TIMEOUT_MS)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            step: Duration::from_millis(DEFAULT_STEP_MS),
            timeout: default_timeout(),
            ignore_permission_denied: false,
            force_polling: false,
            channel_capacity: 4096,
            filter: None,
            debug: false,
            poll_delay: None,
        }
    }
}

impl WatchConfig {
    /// Add a root to watch, recursively.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.roots.push(WatchRoot {
            path: path.as_ref().to_path_buf(),
            recursive_mode: RecursiveMode::Recursive,
        });
        self
    }

    /// Add a root to watch non-recursively (the root directory's immediate
    /// children only).
    pub fn with_path_non_recursive(mut self, path: impl AsRef<Path>) -> Self {
        self.roots.push(WatchRoot {
            path: path.as_ref().to_path_buf(),
            recursive_mode: RecursiveMode::NonRecursive,
        });
        self
    }

    /// How long a path must stay quiet before its change is flushed.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// How often `watch()` re-checks the stop capability while otherwise
    /// idle.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Overall cap on one `watch()` call before it gives up and returns
    /// `Outcome::Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Elide `PermissionDenied` while enumerating a root instead of
    /// failing session construction. Maps to
    /// `WATCHFILES_IGNORE_PERMISSION_DENIED`.
    pub fn with_ignore_permission_denied(mut self, ignore: bool) -> Self {
        self.ignore_permission_denied = ignore;
        self
    }

    /// Force the polling backend regardless of platform. Maps to
    /// `WATCHFILES_FORCE_POLLING`.
    pub fn with_force_polling(mut self, force: bool) -> Self {
        self.force_polling = force;
        self
    }

    /// Capacity of the bounded event channel between the backend and the
    /// debouncer. Overflow drops the oldest queued event.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Apply a predicate to every normalized record before it's delivered.
    /// A cycle whose batch is empty after filtering is treated as if
    /// nothing happened: the debouncer loops again rather than delivering
    /// an empty `Changes`.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(ChangeKind, &Path) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Trace every raw event to the `log` crate at `debug` level before
    /// filtering, regardless of whether it survives normalization.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sample interval for the polling backend, when it ends up being the
    /// one in use. Takes priority over `WATCHFILES_POLL_DELAY_MS`, which
    /// only supplies the default when this is left unset.
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = Some(delay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_roots() {
        assert!(WatchConfig::default().roots.is_empty());
    }

    #[test]
    fn poll_delay_unset_by_default() {
        assert_eq!(WatchConfig::default().poll_delay, None);
        let config = WatchConfig::default().with_poll_delay(Duration::from_millis(500));
        assert_eq!(config.poll_delay, Some(Duration::from_millis(500)));
    }

    #[test]
    fn with_path_accumulates_roots() {
        let config = WatchConfig::default().with_path("/a").with_path_non_recursive("/b");
        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.roots[0].recursive_mode, RecursiveMode::Recursive);
        assert_eq!(config.roots[1].recursive_mode, RecursiveMode::NonRecursive);
    }
}
