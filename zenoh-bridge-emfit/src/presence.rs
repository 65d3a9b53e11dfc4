//! Time-in-bed state machine.
//!
//! Two states. While absent the output is pinned at zero and the anchor
//! follows the clock. While present the output is the elapsed time since
//! the anchor, i.e. since the last poll that saw the bed empty. Nothing
//! is reset on the absent to present edge.

use tokio::time::Instant;

/// Occupancy as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Absent,
    Present,
}

/// Tracks how long the bed has been continuously occupied.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    state: Occupancy,
    anchor: Instant,
}

impl PresenceTracker {
    /// Start absent, anchored at `now`.
    ///
    /// After a restart with someone already in bed, the first durations
    /// count from this instant, not from the real bed entry.
    pub fn new(now: Instant) -> Self {
        Self {
            state: Occupancy::Absent,
            anchor: now,
        }
    }

    pub fn state(&self) -> Occupancy {
        self.state
    }

    /// Instant of the last absent observation (or construction).
    pub fn anchor(&self) -> Instant {
        self.anchor
    }

    /// Feed one observation and return whole seconds in bed.
    pub fn observe(&mut self, present: bool, now: Instant) -> u64 {
        if present {
            self.state = Occupancy::Present;
            now.saturating_duration_since(self.anchor)
                .as_secs_f64()
                .round() as u64
        } else {
            self.state = Occupancy::Absent;
            self.anchor = now;
            0
        }
    }
}
