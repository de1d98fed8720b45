//! Pure debounce timing: no channels, no engine.

use std::time::Duration;

use tokio::time::Instant;

use super::snapshot::{Snapshot, SnapshotId};

/// Settle delay used when no config is given.
pub const DEBOUNCE_MS: u64 = 300;

/// Holds the latest unsubmitted snapshot and when it last changed.
///
/// Intermediate snapshots are replaced, never queued.
pub struct Debouncer {
    settle: Duration,
    pending: Option<Snapshot>,
    last_change: Option<Instant>,
}

impl Debouncer {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            pending: None,
            last_change: None,
        }
    }

    /// Replace the pending snapshot and restart the countdown.
    pub fn push(&mut self, snapshot: Snapshot, now: Instant) {
        self.pending = Some(snapshot);
        self.last_change = Some(now);
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.last_change = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending snapshot becomes eligible, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        self.last_change.map(|t| t + self.settle)
    }

    /// Take the pending snapshot once the settle period has elapsed.
    pub fn take_if_settled(&mut self, now: Instant) -> Option<Snapshot> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.last_change = None;
        self.pending.take()
    }

    /// Drop the pending snapshot if it is not newer than `id`.
    pub fn discard_through(&mut self, id: SnapshotId) {
        if self.pending.as_ref().is_some_and(|p| p.id <= id) {
            self.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: u64, text: &str) -> Snapshot {
        Snapshot::new(SnapshotId(id), text)
    }

    #[test]
    fn test_new_debouncer_idle() {
        let debouncer = Debouncer::new(Duration::from_millis(DEBOUNCE_MS));
        assert!(!debouncer.is_pending());
        assert!(debouncer.deadline().is_none());
    }

    #[test]
    fn test_push_restarts_countdown() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();

        debouncer.push(snap(1, "a"), t0);
        debouncer.push(snap(2, "ab"), t0 + Duration::from_millis(200));

        assert!(debouncer.take_if_settled(t0 + Duration::from_millis(400)).is_none());
        let taken = debouncer
            .take_if_settled(t0 + Duration::from_millis(500))
            .unwrap();
        assert_eq!(taken.id, SnapshotId(2));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_discard_through() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let t0 = Instant::now();

        debouncer.push(snap(5, "x"), t0);
        debouncer.discard_through(SnapshotId(4));
        assert!(debouncer.is_pending());

        debouncer.discard_through(SnapshotId(5));
        assert!(!debouncer.is_pending());
    }
}
