//! Minimum-interval guard.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Rate limiter that admits at most one call per interval.
///
/// The last admitted instant is recorded when the call is admitted, not
/// when the guarded work finishes, so a failed attempt still holds off
/// the next one. Checking and recording happen under one lock.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    /// Create a throttle that has not admitted any call yet.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Admit the call if the interval has elapsed since the last admitted one.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Like [`try_acquire`](Self::try_acquire), measured at `at` instead of now.
    ///
    /// Lets a caller charge the call to the start of the cycle it belongs
    /// to, so latency earlier in the cycle does not shrink the next gap.
    pub fn try_acquire_at(&self, at: Instant) -> bool {
        let mut last = self.last.lock();

        match *last {
            Some(prev) if at.saturating_duration_since(prev) < self.interval => false,
            _ => {
                *last = Some(at);
                true
            }
        }
    }

    /// Instant of the last admitted call while calls are still being rejected.
    pub fn window_start(&self) -> Option<Instant> {
        let now = Instant::now();
        let last = *self.last.lock();
        last.filter(|prev| now.saturating_duration_since(*prev) < self.interval)
    }

    /// Time until the next call would be admitted.
    pub fn remaining(&self) -> Duration {
        match *self.last.lock() {
            Some(prev) => self.interval.saturating_sub(prev.elapsed()),
            None => Duration::ZERO,
        }
    }
}
