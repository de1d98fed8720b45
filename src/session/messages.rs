//! Session commands and their outcomes.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use super::conflict::{Conflict, Resolution, VersionMarker};
use super::error::{SaveError, SessionError};
use crate::scheduler::SnapshotId;

pub type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

pub enum SessionMsg {
    Edit(String),
    Save(Reply<SaveOutcome>),
    ExportPdf(Reply<Vec<u8>>),
    ResolveConflict(Resolution, Reply<ResolveOutcome>),
    Leave(Option<LeaveChoice>, Reply<LeaveOutcome>),
    RetryEngine(Reply<()>),
}

/// Answer to the unsaved-changes prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveChoice {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    /// Session closed.
    Left,
    /// Unsaved changes; call again with a choice.
    NeedsDecision,
    /// Cancelled; nothing changed.
    Stayed,
    /// Save failed; still open and dirty.
    SaveFailed(SaveError),
    /// Save hit a conflict; still open.
    Conflict(Conflict),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another save is running; this one is dropped, not queued.
    InProgress,
    /// Autosave with nothing to write.
    Clean,
    /// Autosave of a blank buffer.
    Empty,
    /// A conflict is waiting for resolution.
    ConflictPending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub snapshot: SnapshotId,
    pub saved_at: DateTime<Utc>,
    /// The fresh compile succeeded and its artifacts were written.
    pub artifacts_stored: bool,
    /// New marker; `None` when the metadata update failed.
    pub marker: Option<VersionMarker>,
    /// Non-critical failure after the source was written.
    pub warning: Option<SaveError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(SaveReport),
    Skipped(SkipReason),
    Conflict(Conflict),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// Local buffer written over the remote copy.
    Overwrote(SaveReport),
    /// Remote copy reloaded into the buffer.
    Reloaded,
    NoConflict,
}
