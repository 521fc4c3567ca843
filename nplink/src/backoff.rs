//! Bounded exponential backoff for link reconnection.

use std::time::Duration;

/// Delay before the first retry after a failure.
pub const BACKOFF_FLOOR: Duration = Duration::from_millis(1000);

/// Upper bound on the retry delay.
pub const BACKOFF_CEILING: Duration = Duration::from_millis(15_000);

/// Per-link retry delay tracker.
///
/// The delay starts at [`BACKOFF_FLOOR`], doubles on every consecutive
/// failure and saturates at [`BACKOFF_CEILING`]. A successful connect
/// resets it to the floor.
#[derive(Debug, Clone)]
pub struct Backoff {
    delay: Duration,
}

impl Backoff {
    pub fn new() -> Self {
        Self {
            delay: BACKOFF_FLOOR,
        }
    }

    /// Delay to apply to the next retry. Doubles the stored delay,
    /// saturating at the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay;
        self.delay = (self.delay * 2).min(BACKOFF_CEILING);
        current
    }

    /// Reset to the floor after a successful connect.
    pub fn reset(&mut self) {
        self.delay = BACKOFF_FLOOR;
    }

    /// Delay the next failure would use, without consuming it.
    pub fn current(&self) -> Duration {
        self.delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
