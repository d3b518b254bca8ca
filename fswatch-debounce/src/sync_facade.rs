//! The synchronous iterator facade: a lazy,
//! finite-or-infinite sequence of [`ChangeBatch`]es over one
//! [`WatchSession`].

use crate::config::WatchConfig;
use crate::session::WatchSession;
use crate::stop::StopHandle;
use fswatch_types::{ChangeBatch, Error, ErrorKind, Outcome, Result};

/// A blocking `Iterator<Item = Result<ChangeBatch>>` built on repeated
/// calls to [`WatchSession::watch`].
///
/// Construction opens the session; dropping `Watch` closes it, releasing
/// the backend's resources (scoped acquisition).
pub struct Watch {
    session: WatchSession,
    stop: StopHandle,
    yield_on_timeout: bool,
    raise_interrupt: bool,
}

impl Watch {
    /// Open a session over `config` with default facade options (no
    /// timeout batches, interrupts end iteration silently).
    pub fn open(config: WatchConfig) -> Result<Self> {
        Ok(Self {
            session: WatchSession::open(config)?,
            stop: StopHandle::new(),
            yield_on_timeout: false,
            raise_interrupt: false,
        })
    }

    /// Yield an empty batch on every `Timeout` cycle instead of silently
    /// looping past it.
    pub fn yield_on_timeout(mut self, yes: bool) -> Self {
        self.yield_on_timeout = yes;
        self
    }

    /// Raise `Error { kind: Interrupted, .. }` from `next()` instead of
    /// silently ending iteration when a signal-triggered stop is observed.
    pub fn raise_interrupt(mut self, yes: bool) -> Self {
        self.raise_interrupt = yes;
        self
    }

    /// A handle that stops this watch from any thread, including a signal
    /// handler. Call [`StopHandle::signal`] (not [`StopHandle::set`]) to
    /// have the resulting `Stop` reported as `Signal` — the core installs no
    /// handler of its own.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn finish_interrupted(&mut self) -> Option<Result<ChangeBatch>> {
        self.session.close();
        if self.raise_interrupt {
            Some(Err(Error::new(ErrorKind::Interrupted)))
        } else {
            log::warn!("watch ended by interrupt signal");
            None
        }
    }
}

impl Iterator for Watch {
    type Item = Result<ChangeBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let outcome = match self.session.watch(&self.stop) {
                Ok(outcome) => outcome,
                Err(e) => return Some(Err(e)),
            };
            match outcome {
                Outcome::Changes(batch) => return Some(Ok(batch)),
                Outcome::Timeout => {
                    if self.yield_on_timeout {
                        return Some(Ok(ChangeBatch::new()));
                    }
                    continue;
                }
                Outcome::Stop if self.stop.was_signaled() => return self.finish_interrupted(),
                Outcome::Stop => {
                    self.session.close();
                    return None;
                }
                Outcome::Signal => return self.finish_interrupted(),
                Outcome::BackendFailed => return Some(Err(Error::new(ErrorKind::BackendFailed))),
            }
        }
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        self.session.close();
    }
}
