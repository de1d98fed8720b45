//! Observable session state.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::conflict::Conflict;
use super::permission::Permissions;
use crate::engine::{CompileError, EngineError};
use crate::layout::Pagination;
use crate::scheduler::SnapshotId;
use crate::store::ProjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    /// Loaded, nothing unsaved.
    Ready,
    /// Unsaved edits.
    Editing,
    Saving,
    /// Remote changed since load; waiting for a resolution.
    Conflict,
    Closed,
}

/// What the preview pane shows.
#[derive(Debug, Clone)]
pub enum Preview {
    /// Blank buffer.
    Empty,
    /// First compile not back yet.
    Pending,
    Pages(Arc<Pagination>),
    /// Scoped to one snapshot; the next good compile clears it.
    Error(CompileError),
    /// Engine could not start. Editing and saving still work.
    Unavailable(EngineError),
}

impl Preview {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A transient message for the user (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Snapshot of everything the surrounding UI renders.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub project_id: ProjectId,
    pub title: String,
    pub typ_path: String,
    pub permissions: Permissions,
    pub phase: Phase,
    pub buffer: Arc<str>,
    pub snapshot: SnapshotId,
    pub dirty: bool,
    pub compiling: bool,
    pub saving: bool,
    pub preview: Preview,
    /// Snapshot the preview was produced from.
    pub preview_snapshot: Option<SnapshotId>,
    pub warnings: Vec<String>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub conflict: Option<Conflict>,
    pub notice: Option<Notice>,
}

impl SessionView {
    pub fn loading(project_id: ProjectId) -> Self {
        Self {
            project_id,
            title: String::new(),
            typ_path: String::new(),
            permissions: Permissions::READER,
            phase: Phase::Loading,
            buffer: Arc::from(""),
            snapshot: SnapshotId::default(),
            dirty: false,
            compiling: false,
            saving: false,
            preview: Preview::Pending,
            preview_snapshot: None,
            warnings: Vec::new(),
            last_saved_at: None,
            conflict: None,
            notice: None,
        }
    }
}

/// Decides whether a compile result may replace the preview.
///
/// Only the result for the newest edit is shown. Since edit ids only grow,
/// the preview can never move back to an older snapshot.
#[derive(Debug, Default)]
pub struct StalenessGate {
    latest: SnapshotId,
    shown: Option<SnapshotId>,
}

impl StalenessGate {
    pub fn new(latest: SnapshotId) -> Self {
        Self {
            latest,
            shown: None,
        }
    }

    /// Record a new edit.
    pub fn advance(&mut self, id: SnapshotId) {
        self.latest = self.latest.max(id);
    }

    pub fn latest(&self) -> SnapshotId {
        self.latest
    }

    pub fn is_current(&self, id: SnapshotId) -> bool {
        id == self.latest
    }

    /// Accept `id` for display if it is current and not older than what is
    /// already shown.
    pub fn accept(&mut self, id: SnapshotId) -> bool {
        if !self.is_current(id) || self.shown.is_some_and(|shown| id < shown) {
            return false;
        }
        self.shown = Some(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_rejects_superseded_results() {
        let mut gate = StalenessGate::new(SnapshotId(1));
        gate.advance(SnapshotId(2));

        // B (2) returns first, then A (1)
        assert!(gate.accept(SnapshotId(2)));
        assert!(!gate.accept(SnapshotId(1)));
    }

    #[test]
    fn test_gate_rejects_result_for_pending_edit() {
        let mut gate = StalenessGate::new(SnapshotId(1));
        gate.advance(SnapshotId(3));
        assert!(!gate.accept(SnapshotId(1)));
        assert!(gate.accept(SnapshotId(3)));
    }

    #[test]
    fn test_gate_advance_is_monotonic() {
        let mut gate = StalenessGate::new(SnapshotId(5));
        gate.advance(SnapshotId(2));
        assert_eq!(gate.latest(), SnapshotId(5));
    }
}
