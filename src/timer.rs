//! Cancellable one-shot deadlines.
//!
//! Timers never run callbacks on their own. The owner polls
//! [`Timer::take_due`] from the processing queue, so cancellation and expiry
//! can never interleave.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub const fn new() -> Self {
        Self { deadline: None }
    }

    /// Arms the timer, superseding any outstanding deadline.
    #[inline]
    pub fn arm(&mut self, now: Instant, duration: Duration) {
        self.deadline = Some(now + duration);
    }

    /// Cancels the outstanding deadline. Returns whether one was pending.
    #[inline]
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    #[inline(always)]
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    #[inline(always)]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarms and returns true if the deadline has elapsed at `now`.
    #[inline]
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of two optional deadlines.
#[inline]
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once() {
        let now = Instant::now();
        let mut timer = Timer::new();
        timer.arm(now, Duration::from_millis(100));

        assert!(!timer.take_due(now + Duration::from_millis(99)));
        assert!(timer.take_due(now + Duration::from_millis(100)));
        assert!(!timer.take_due(now + Duration::from_millis(500)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let now = Instant::now();
        let mut timer = Timer::new();
        timer.arm(now, Duration::from_millis(10));

        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert!(!timer.take_due(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_rearm_supersedes() {
        let now = Instant::now();
        let mut timer = Timer::new();
        timer.arm(now, Duration::from_millis(10));
        timer.arm(now + Duration::from_millis(5), Duration::from_millis(10));

        assert!(!timer.take_due(now + Duration::from_millis(12)));
        assert!(timer.take_due(now + Duration::from_millis(15)));
    }

    #[test]
    fn test_earliest() {
        let now = Instant::now();
        let later = now + Duration::from_millis(1);
        assert_eq!(earliest(Some(later), Some(now)), Some(now));
        assert_eq!(earliest(None, Some(now)), Some(now));
        assert_eq!(earliest(Some(later), None), Some(later));
        assert_eq!(earliest(None, None), None);
    }
}
