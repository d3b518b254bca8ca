//! Backend configuration.

use std::time::Duration;

/// Whether a watch applies to a single directory or its whole subtree.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum RecursiveMode {
    /// Watch the directory and every subdirectory, including ones created
    /// after the watch is installed.
    Recursive,
    /// Watch only the given directory and its immediate children.
    NonRecursive,
}

impl RecursiveMode {
    pub(crate) fn is_recursive(&self) -> bool {
        matches!(self, RecursiveMode::Recursive)
    }
}

/// Backend configuration.
///
/// Not every option applies to every backend; a backend silently ignores
/// options it has no use for.
///
/// ```rust
/// # use std::time::Duration;
/// # use fswatch_core::Config;
/// let config = Config::default()
///     .with_poll_interval(Duration::from_millis(300))
///     .with_compare_contents(true);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Config {
    poll_interval: Duration,
    compare_contents: bool,
    follow_symlinks: bool,
    ignore_permission_denied: bool,
}

impl Config {
    /// For [`PollWatcher`](crate::PollWatcher): interval between rescans.
    /// Large trees make this expensive; tune accordingly.
    pub fn with_poll_interval(mut self, dur: Duration) -> Self {
        self.poll_interval = dur;
        self
    }

    /// Returns the current poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// For [`PollWatcher`](crate::PollWatcher): hash file contents instead
    /// of trusting mtimes to decide whether a file changed. Needed for
    /// pseudo filesystems (`/proc`, `/sys`) that don't maintain real
    /// modification times. Off by default; expensive when on.
    pub fn with_compare_contents(mut self, compare_contents: bool) -> Self {
        self.compare_contents = compare_contents;
        self
    }

    /// Returns the current setting.
    pub fn compare_contents(&self) -> bool {
        self.compare_contents
    }

    /// Whether symlinks are followed when recursively enumerating a
    /// directory. On by default.
    pub fn with_follow_symlinks(mut self, follow_symlinks: bool) -> Self {
        self.follow_symlinks = follow_symlinks;
        self
    }

    /// Returns the current setting.
    pub fn follow_symlinks(&self) -> bool {
        self.follow_symlinks
    }

    /// Whether a `PermissionDenied` while enumerating a subtree is skipped
    /// rather than surfaced as a fatal error. Maps to
    /// `WATCHFILES_IGNORE_PERMISSION_DENIED`. Off by default.
    pub fn with_ignore_permission_denied(mut self, ignore: bool) -> Self {
        self.ignore_permission_denied = ignore;
        self
    }

    /// Returns the current setting.
    pub fn ignore_permission_denied(&self) -> bool {
        self.ignore_permission_denied
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            compare_contents: false,
            follow_symlinks: true,
            ignore_permission_denied: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_300ms_poll_no_content_hash_follow_symlinks() {
        assert_eq!(Config::default().poll_interval(), Duration::from_millis(300));
        assert!(!Config::default().compare_contents());
        assert!(Config::default().follow_symlinks());
    }

    #[test]
    fn builder_overrides_apply() {
        let config = Config::default()
            .with_poll_interval(Duration::from_secs(2))
            .with_compare_contents(true)
            .with_follow_symlinks(false)
            .with_ignore_permission_denied(true);
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert!(config.compare_contents());
        assert!(!config.follow_symlinks());
        assert!(config.ignore_permission_denied());
    }
}
