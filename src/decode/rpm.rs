//! Debounced RPM pulse timer
//!
//! Each qualifying pulse edge (a spark, a flow vane passing, a hall sensor)
//! yields an instantaneous RPM of `60000 / delta_ms`; the timer keeps a
//! smoothed estimate in integer arithmetic only - the update must finish
//! well inside the shortest pulse interval, so no floating point.
//!
//! Edges closer than [`DEBOUNCE_MS`] to the previous accepted edge are
//! coalesced: sparks echo electrically for ~5ms, so anything under 6ms is
//! the same event. The debounce caps the measurable range at 10000 RPM.

/// Minimum spacing between accepted pulses
pub const DEBOUNCE_MS: u64 = 6;

/// Debounced interval timer producing a smoothed RPM estimate.
///
/// Written only from the decode context; the module publishes the values it
/// needs through atomics.
#[derive(Debug)]
pub struct PulseTimer {
    /// Smoothing window; pulses further apart than this set the estimate
    /// directly (fast reset after a stall)
    reaction_window_ms: u32,
    last_pulse_ms: u64,
    seen_pulse: bool,
    smoothed_rpm: i64,
}

impl PulseTimer {
    pub fn new(reaction_window_ms: u32) -> Self {
        Self {
            reaction_window_ms: reaction_window_ms.max(1),
            last_pulse_ms: 0,
            seen_pulse: false,
            smoothed_rpm: 0,
        }
    }

    /// Feed one falling edge. Returns whether the pulse was accepted (false
    /// means it was coalesced into the previous one and nothing changed).
    pub fn on_pulse(&mut self, now_ms: u64) -> bool {
        if !self.seen_pulse {
            // First pulse only anchors the interval measurement
            self.seen_pulse = true;
            self.last_pulse_ms = now_ms;
            return true;
        }

        let delta = now_ms.saturating_sub(self.last_pulse_ms);
        if delta < DEBOUNCE_MS {
            return false;
        }

        let instant = (60_000 / delta) as i64;
        let window = self.reaction_window_ms as i64;
        if delta >= window as u64 {
            self.smoothed_rpm = instant;
        } else {
            // First-order update, weighted by how much of the smoothing
            // window this interval did not cover
            let delta = delta as i64;
            self.smoothed_rpm += (window - delta) * (instant - self.smoothed_rpm) / window;
        }
        self.last_pulse_ms = now_ms;
        true
    }

    /// Current smoothed estimate
    pub fn smoothed_rpm(&self) -> u32 {
        self.smoothed_rpm.max(0) as u32
    }

    /// Timestamp of the last accepted pulse, if any
    pub fn last_pulse_ms(&self) -> Option<u64> {
        self.seen_pulse.then_some(self.last_pulse_ms)
    }
}

/// Value to report when no pulse has arrived within the report interval:
/// assume the next pulse will take twice as long as we have already waited,
/// so a stalled engine reads as slowing toward zero instead of freezing at
/// its last estimate.
pub fn decayed_rpm(smoothed_rpm: u32, last_pulse_ms: Option<u64>, now_ms: u64, report_interval_ms: u64) -> u32 {
    let Some(last) = last_pulse_ms else {
        return 0;
    };
    let elapsed = now_ms.saturating_sub(last);
    if elapsed > report_interval_ms {
        (30_000 / elapsed.max(1)) as u32
    } else {
        smoothed_rpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_interval_sets_estimate_directly() {
        let mut timer = PulseTimer::new(200);
        assert!(timer.on_pulse(1000));
        assert!(timer.on_pulse(1200)); // delta 200 >= window
        assert_eq!(timer.smoothed_rpm(), 300);
    }

    #[test]
    fn test_short_intervals_smooth() {
        let mut timer = PulseTimer::new(200);
        timer.on_pulse(1000);
        timer.on_pulse(1100); // delta 100, instant 600
        // 0 + (200 - 100) * (600 - 0) / 200 = 300
        assert_eq!(timer.smoothed_rpm(), 300);
        timer.on_pulse(1200); // delta 100, instant 600
        // 300 + 100 * 300 / 200 = 450
        assert_eq!(timer.smoothed_rpm(), 450);
    }

    #[test]
    fn test_debounce_coalesces_close_edges() {
        let mut timer = PulseTimer::new(200);
        timer.on_pulse(1000);
        timer.on_pulse(1200);
        let before = timer.smoothed_rpm();

        // 3ms later: same event, no update, interval anchor unchanged
        assert!(!timer.on_pulse(1203));
        assert_eq!(timer.smoothed_rpm(), before);
        assert_eq!(timer.last_pulse_ms(), Some(1200));
    }

    #[test]
    fn test_decay_strictly_decreases_while_stalled() {
        let mut timer = PulseTimer::new(200);
        timer.on_pulse(1000);
        timer.on_pulse(1100);

        let last = timer.last_pulse_ms();
        let smoothed = timer.smoothed_rpm();
        let mut previous = u32::MAX;
        for now in [1250u64, 1400, 1700, 2100, 3100] {
            let reported = decayed_rpm(smoothed, last, now, 100);
            assert!(
                reported < previous,
                "expected decay: {} !< {}",
                reported,
                previous
            );
            previous = reported;
        }
    }

    #[test]
    fn test_fresh_estimate_reported_unchanged() {
        let mut timer = PulseTimer::new(200);
        timer.on_pulse(1000);
        timer.on_pulse(1100);
        assert_eq!(
            decayed_rpm(timer.smoothed_rpm(), timer.last_pulse_ms(), 1150, 100),
            timer.smoothed_rpm()
        );
    }

    #[test]
    fn test_no_pulse_ever_reports_zero() {
        assert_eq!(decayed_rpm(0, None, 5000, 100), 0);
    }
}
