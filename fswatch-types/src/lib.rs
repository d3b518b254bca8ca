//! Wire types shared across the `fswatch` crates.
//!
//! This crate has no I/O of its own: it exists so that `fswatch-core` (the
//! backends) and `fswatch-debounce` (the debouncer and facades) can agree on
//! the shape of a change without either depending on the other.

pub mod change;
pub mod error;
pub mod outcome;

pub use change::{ChangeBatch, ChangeKind, ChangeRecord, RawEvent};
pub use error::{Error, ErrorKind};
pub use outcome::Outcome;
