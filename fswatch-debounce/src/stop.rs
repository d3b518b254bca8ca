//! The stop capability: an opaque, thread-safe `is_set()`
//! observable polled by the debounce loop between waits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// External capability the debounce loop polls between waits. Implement
/// this directly to plug in an existing cancellation primitive; most
/// callers just use [`StopHandle`].
pub trait StopSignal: Send + Sync {
    /// Whether the stop condition has fired.
    fn is_set(&self) -> bool;
}

impl StopSignal for AtomicBool {
    fn is_set(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

impl<T: StopSignal + ?Sized> StopSignal for Arc<T> {
    fn is_set(&self) -> bool {
        (**self).is_set()
    }
}

/// A cloneable, `Send + Sync` stop capability: the handle every
/// `WatchSession`-based facade hands out so another thread (a signal
/// handler, a UI "stop watching" button) can end an in-progress `watch()`
/// call.
///
/// Distinguishes a plain stop from one caused specifically by an observed
/// interrupt signal, so a facade can translate the resulting `Stop` outcome
/// into `Signal`. The core crate installs no signal handler of its own —
/// a caller that wants SIGINT/Ctrl-C to stop
/// a watch wires its own handler to call [`StopHandle::signal`].
#[derive(Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    signaled: Arc<AtomicBool>,
}

impl StopHandle {
    /// A handle that has not fired yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop for an ordinary reason (session close, explicit
    /// cancellation).
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Request a stop and mark it as having come from an observed
    /// interrupt signal, so the owning facade reports `Signal` instead of
    /// `Stop`.
    pub fn signal(&self) {
        self.signaled.store(true, Ordering::SeqCst);
        self.set();
    }

    /// Whether [`StopHandle::signal`] (rather than [`StopHandle::set`])
    /// caused this handle to fire.
    pub fn was_signaled(&self) -> bool {
        self.signaled.load(Ordering::SeqCst)
    }
}

impl StopSignal for StopHandle {
    fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_handle_is_unset() {
        assert!(!StopHandle::new().is_set());
    }

    #[test]
    fn set_fires_without_marking_signal() {
        let h = StopHandle::new();
        h.set();
        assert!(h.is_set());
        assert!(!h.was_signaled());
    }

    #[test]
    fn signal_fires_and_marks_signal() {
        let h = StopHandle::new();
        h.signal();
        assert!(h.is_set());
        assert!(h.was_signaled());
    }
}
