//! Single autosave countdown per session.

use std::time::Duration;

use tokio::time::Instant;

/// Fires once after `interval` of quiet. Every `arm` replaces the previous
/// deadline, so continuous editing keeps pushing it back.
pub struct AutosaveTimer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl AutosaveTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearm_pushes_deadline() {
        let mut timer = AutosaveTimer::new(Duration::from_secs(60));
        let t0 = Instant::now();

        timer.arm(t0);
        timer.arm(t0 + Duration::from_secs(50));
        assert!(!timer.fire(t0 + Duration::from_secs(70)));
        assert!(timer.fire(t0 + Duration::from_secs(110)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_disarmed_never_fires() {
        let mut timer = AutosaveTimer::new(Duration::from_secs(1));
        let t0 = Instant::now();
        timer.arm(t0);
        timer.disarm();
        assert!(timer.deadline().is_none());
        assert!(!timer.fire(t0 + Duration::from_secs(10)));
    }
}
