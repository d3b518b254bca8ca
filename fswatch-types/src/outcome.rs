//! The [`Outcome`] of one `Debouncer::watch` call.

use crate::change::ChangeBatch;

/// What a single call to the debouncer's `watch` loop produced.
///
/// Modeled as a tagged sum type rather than a sentinel mixed into a
/// collection: callers match on the variant instead of inspecting an empty
/// set to distinguish "nothing happened" from "something happened and it
/// was empty".
#[derive(Debug)]
pub enum Outcome {
    /// At least one path settled and the debounce rule fired; the batch is
    /// already normalized (duplicate `(kind, path)` pairs collapsed to one
    /// record each — no cross-kind reconciliation) and ready to hand to a
    /// consumer.
    Changes(ChangeBatch),
    /// `timeout_ms` elapsed with no events accumulated.
    Timeout,
    /// The stop capability was observed set before any delivery condition
    /// fired.
    Stop,
    /// The synchronous facade observed an interrupt signal while blocked.
    Signal,
    /// The backend thread terminated unexpectedly.
    BackendFailed,
}

impl Outcome {
    /// The literal wire token for this outcome. `Changes`
    /// has no single token (it carries data), so this returns `None` for
    /// it; use [`Outcome::changes`] to get at the payload instead.
    pub fn wire_token(&self) -> Option<&'static str> {
        match self {
            Outcome::Changes(_) => None,
            Outcome::Timeout => Some("timeout"),
            Outcome::Stop => Some("stop"),
            Outcome::Signal => Some("signal"),
            Outcome::BackendFailed => Some("backend_failed"),
        }
    }

    /// Borrow the accumulated batch if this is a `Changes` outcome.
    pub fn changes(&self) -> Option<&ChangeBatch> {
        match self {
            Outcome::Changes(batch) => Some(batch),
            _ => None,
        }
    }

    /// True if this outcome should end the facade's iteration entirely
    /// (as opposed to looping for another cycle).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Stop | Outcome::Signal | Outcome::BackendFailed)
    }
}
