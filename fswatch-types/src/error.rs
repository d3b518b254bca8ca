//! The error taxonomy for the change-detection engine.
//!
//! Modeled as a hand-rolled enum with a manual [`std::error::Error`] impl,
//! following the `notify` crate's own `Error`/`ErrorKind` split rather than
//! reaching for `thiserror`: this crate is meant to sit at the bottom of
//! other people's dependency trees, so it keeps its own deps minimal.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Any error produced by the engine.
#[derive(Debug)]
pub struct Error {
    /// The specific failure.
    pub kind: ErrorKind,
    /// Paths relevant to the failure, if any (usually exactly one).
    pub paths: Vec<PathBuf>,
}

impl Error {
    /// Build an error with no associated paths.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            paths: Vec::new(),
        }
    }

    /// Attach a path to this error (builder-style).
    pub fn add_path(mut self, path: PathBuf) -> Self {
        self.paths.push(path);
        self
    }

    /// Shorthand for [`ErrorKind::PathNotFound`].
    pub fn path_not_found(path: PathBuf) -> Self {
        Self::new(ErrorKind::PathNotFound).add_path(path)
    }

    /// Shorthand for [`ErrorKind::PermissionDenied`].
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::new(ErrorKind::PermissionDenied).add_path(path)
    }

    /// Shorthand for [`ErrorKind::Io`].
    pub fn io(err: io::Error) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for path in &self.paths {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    // `PermissionDenied` gets its own variant rather than folding into
    // `Io` because callers (the session's `ignore_permission_denied`
    // handling) match on it specifically; every other `io::Error` keeps
    // its original kind wrapped so nothing else is lost.
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            Error::new(ErrorKind::PermissionDenied)
        } else {
            Error::io(err)
        }
    }
}

/// The specific way an engine call can fail.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A root in [`crate`](crate)'s `WatchConfig` does not exist at session
    /// construction time. Fatal, surfaced immediately.
    PathNotFound,
    /// Enumeration of a root or subtree was denied. Fatal unless the
    /// session's `ignore_permission_denied` option elides it.
    PermissionDenied,
    /// `watch` was called on a session that has already been closed.
    WatcherClosed,
    /// The stop capability supplied to `watch` doesn't behave like one
    /// (e.g. its `is_set` panicked).
    StopEventMalformed,
    /// The backend's worker thread terminated unexpectedly.
    BackendFailed,
    /// A user-visible interrupt was delivered while the facade was
    /// configured to raise it rather than stop silently.
    Interrupted,
    /// The current platform has no native backend and polling was not
    /// requested; the Backend Selector uses this internally to trigger its
    /// own fallback and it should not usually escape to a caller.
    UnsupportedPlatform,
    /// A lower-level I/O failure not covered by a more specific variant.
    Io(io::Error),
    /// An error represented as an arbitrary message, used for conditions
    /// that don't need their own variant (e.g. a malformed configuration
    /// value).
    Generic(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::PathNotFound => write!(f, "watched path does not exist"),
            ErrorKind::PermissionDenied => write!(f, "permission denied while enumerating path"),
            ErrorKind::WatcherClosed => write!(f, "watch session is closed"),
            ErrorKind::StopEventMalformed => write!(f, "stop capability is not callable"),
            ErrorKind::BackendFailed => write!(f, "backend thread terminated unexpectedly"),
            ErrorKind::Interrupted => write!(f, "interrupted"),
            ErrorKind::UnsupportedPlatform => write!(f, "no native backend for this platform"),
            ErrorKind::Io(e) => write!(f, "I/O error: {e}"),
            ErrorKind::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

/// A specialised `Result` for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_paths() {
        let err = Error::path_not_found(PathBuf::from("/no/such/dir"));
        let msg = err.to_string();
        assert!(msg.contains("does not exist"));
        assert!(msg.contains("/no/such/dir"));
    }

    #[test]
    fn io_error_is_source() {
        use std::error::Error as _;
        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        let err = Error::io(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn permission_denied_io_error_converts_to_its_own_kind() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err.kind, ErrorKind::PermissionDenied));
    }

    #[test]
    fn other_io_errors_keep_their_kind() {
        let io_err = io::Error::new(io::ErrorKind::Other, "boom");
        let err: Error = io_err.into();
        assert!(matches!(err.kind, ErrorKind::Io(_)));
    }
}
