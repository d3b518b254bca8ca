//! The debouncing coordinator over `fswatch-core`'s Event Channel, plus
//! synchronous and (optionally) cooperative-asynchronous facades over it.
//!
//! ```toml
//! [dependencies]
//! fswatch-debounce = "0.1"
//! ```
//!
//! [`WatchSession::watch`] accumulates raw events from a selected backend
//! until one of four conditions fires — the debounce window elapses, the
//! backend goes quiet for `step_ms`, the caller's stop capability is set,
//! or the session's overall timeout is reached — then normalizes and
//! filters the accumulated set into a [`fswatch_types::ChangeBatch`].
//! [`sync_facade::Watch`] wraps that into a blocking `Iterator`;
//! [`async_facade::AsyncWatch`] (behind the `tokio` feature) wraps it into
//! a cooperative `Stream`.
//!
//! ### Crossbeam-channel & Tokio
//!
//! `crossbeam-channel` is a default feature, mirroring `fswatch-core`'s
//! own; disable it to fall back to `std::sync::mpsc` inside the backend.

#![deny(missing_docs)]

mod debounce;
mod normalize;

pub mod config;
pub mod session;
pub mod stop;
pub mod sync_facade;

#[cfg(feature = "tokio")]
pub mod async_facade;

pub use config::WatchConfig;
pub use session::WatchSession;
pub use stop::{StopHandle, StopSignal};
pub use sync_facade::Watch;

#[cfg(feature = "tokio")]
pub use async_facade::AsyncWatch;

pub use fswatch_types::{ChangeBatch, ChangeKind, ChangeRecord, Error, ErrorKind, Outcome, RawEvent, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn builder_sets_requested_debounce() {
        let config = WatchConfig::default().with_path("/tmp").with_debounce(Duration::from_millis(5));
        assert_eq!(config.debounce, Duration::from_millis(5));
    }
}
