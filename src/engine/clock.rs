//! Accrual checkpoint clock.

use serde::{Deserialize, Serialize};

use crate::domain::primitives::Timestamp;

/// Tracks the instant a strategy last settled accrual.
///
/// The checkpoint only moves forward. A caller-supplied `now` earlier than
/// the checkpoint yields zero elapsed seconds and leaves the checkpoint in
/// place, so a skewed clock can never reopen a window that already
/// settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualClock {
    last_checkpoint: Timestamp,
}

impl AccrualClock {
    pub fn new(now: Timestamp) -> Self {
        AccrualClock {
            last_checkpoint: now,
        }
    }

    pub fn last_checkpoint(&self) -> Timestamp {
        self.last_checkpoint
    }

    /// Seconds between the checkpoint and `now`, clamped at zero.
    pub fn elapsed(&self, now: Timestamp) -> u64 {
        now.seconds_since(self.last_checkpoint)
    }

    /// The checkpoint this clock will hold once settled at `now`.
    pub fn advanced(&self, now: Timestamp) -> Timestamp {
        self.last_checkpoint.max(now)
    }

    /// Move the checkpoint up to `now`. Runs on every settlement, zero
    /// accrual included, so each window is counted exactly once.
    pub fn advance(&mut self, now: Timestamp) {
        self.last_checkpoint = self.advanced(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_from_checkpoint() {
        let clock = AccrualClock::new(Timestamp::new(1_000));
        assert_eq!(clock.elapsed(Timestamp::new(1_000)), 0);
        assert_eq!(clock.elapsed(Timestamp::new(1_090)), 90);
    }

    #[test]
    fn test_backwards_time_is_clamped() {
        let mut clock = AccrualClock::new(Timestamp::new(1_000));
        assert_eq!(clock.elapsed(Timestamp::new(900)), 0);
        clock.advance(Timestamp::new(900));
        assert_eq!(clock.last_checkpoint(), Timestamp::new(1_000));
    }

    #[test]
    fn test_advance_is_monotone() {
        let mut clock = AccrualClock::new(Timestamp::new(0));
        clock.advance(Timestamp::new(50));
        clock.advance(Timestamp::new(40));
        clock.advance(Timestamp::new(60));
        assert_eq!(clock.last_checkpoint(), Timestamp::new(60));
    }
}
