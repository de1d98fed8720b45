//! Immutable buffer snapshots.

use std::fmt;
use std::sync::Arc;

/// Monotonic edit counter. Larger ids are newer buffer states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotId(pub u64);

impl SnapshotId {
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The buffer text at one instant, tagged with its id.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub text: Arc<str>,
}

impl Snapshot {
    pub fn new(id: SnapshotId, text: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Empty or whitespace-only text is never compiled.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
