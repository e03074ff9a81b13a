//! Monotonic time source for the scheduler
//!
//! All tick timestamps and edge-event timestamps must come from the same
//! monotonic base so that interval arithmetic between the two contexts is
//! meaningful.

use std::time::Instant;

/// Monotonic clock anchored at construction
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: Instant,
}

impl Clock {
    /// Create a new clock; time zero is now
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Milliseconds since the clock was created
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Microseconds since the clock was created
    #[inline]
    pub fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
