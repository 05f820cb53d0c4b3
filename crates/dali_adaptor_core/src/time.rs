//! # Monotonic Time
//!
//! All frame timing is measured against one monotonic anchor so deltas are
//! never negative.

use std::time::{Duration, Instant};

/// Monotonic clock anchored when the service is created.
#[derive(Clone, Copy, Debug)]
pub struct TimeService {
    epoch: Instant,
}

impl Default for TimeService {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeService {
    /// Anchors a new clock at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Nanoseconds since the anchor.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn nanoseconds(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Microseconds since the anchor.
    #[inline]
    #[must_use]
    pub fn microseconds(&self) -> u64 {
        self.nanoseconds() / 1_000
    }

    /// Sleeps until the clock reads `target_ns`. Returns at once if that is past.
    pub fn sleep_until(&self, target_ns: u64) {
        let now = self.nanoseconds();
        if target_ns > now {
            std::thread::sleep(Duration::from_nanos(target_ns - now));
        }
    }
}
