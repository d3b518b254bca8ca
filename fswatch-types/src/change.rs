//! The canonical change vocabulary: [`ChangeKind`], [`RawEvent`], [`ChangeRecord`]
//! and [`ChangeBatch`].

use std::collections::HashSet;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The three kinds of change the engine ever reports.
///
/// The discriminants are part of the wire contract: `Added` is always `1`,
/// `Modified` is always `2`, `Deleted` is always `3`, matching the integer
/// form used when a [`ChangeRecord`] crosses a process boundary (e.g. in a
/// reload subprocess's environment).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(u8)]
pub enum ChangeKind {
    /// A new file or directory entry was created.
    Added = 1,
    /// An existing entry's data or metadata changed.
    Modified = 2,
    /// An entry was removed.
    Deleted = 3,
}

impl ChangeKind {
    /// The lowercase wire name (`"added"`, `"modified"`, `"deleted"`).
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }

    /// Recover a `ChangeKind` from its wire integer (`1`, `2`, `3`).
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            1 => Some(ChangeKind::Added),
            2 => Some(ChangeKind::Modified),
            3 => Some(ChangeKind::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl Serialize for ChangeKind {
    // Serializes as the wire integer (1/2/3), not the variant name: this is
    // the form `WATCHFILES_CHANGES`-style env payloads and cross-process
    // wire tokens rely on.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for ChangeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        ChangeKind::from_wire(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid ChangeKind wire value: {value}")))
    }
}

/// A `(kind, path)` tuple as produced by a backend, before deduplication.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// The absolute path the backend reported.
    pub path: PathBuf,
}

impl RawEvent {
    /// Build a new raw event.
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// A `(kind, path)` tuple as delivered to a consumer, after deduplication
/// and filtering. Structurally identical to [`RawEvent`]; kept as a distinct
/// type so normalizer input and output can't be mixed up by accident.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChangeRecord {
    /// What happened.
    pub kind: ChangeKind,
    /// The path that changed.
    pub path: PathBuf,
}

impl ChangeRecord {
    /// Build a new change record.
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl From<RawEvent> for ChangeRecord {
    fn from(e: RawEvent) -> Self {
        ChangeRecord {
            kind: e.kind,
            path: e.path,
        }
    }
}

/// An unordered, deduplicated set of [`ChangeRecord`]s delivered to the
/// consumer in one debounce cycle.
pub type ChangeBatch = HashSet<ChangeRecord>;
