//! RPM module (letter `R`)
//!
//! Counts debounced pulses (spark plug clamp, hall sensor) on one input pin
//! and reports a smoothed RPM at a fixed rate regardless of engine speed.
//! When no pulse has arrived within the report interval the reported value
//! decays toward zero instead of freezing at the last estimate, so a stall
//! is visible on the host side within about a second.
//!
//! Output line: `R` + 3 uppercase hex digits (`RFFF` for out-of-range).

use crate::core::Module;
use crate::decode::rpm::{decayed_rpm, PulseTimer};
use crate::decode::{EdgeEvent, EdgePolarity};
use crate::error::{Error, Result};
use crate::telemetry::Telemetry;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Largest value representable in the 3-digit report
const RPM_REPORT_MAX: u32 = 0xFFF;

/// How long the pulse thread waits for an edge before rechecking shutdown
const IDLE_POLL_MS: u64 = 50;

/// State shared between the pulse thread (writer) and the tick (reader)
#[derive(Default)]
struct RpmShared {
    smoothed_rpm: AtomicU32,
    last_pulse_ms: AtomicU64,
    seen_pulse: AtomicBool,
}

/// RPM pulse counter module
pub struct RpmModule {
    events: Option<Receiver<EdgeEvent>>,
    reaction_window_ms: u32,
    report_interval_ms: u32,
    next_report_at: u64,
    shared: Arc<RpmShared>,
    telemetry: Telemetry,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RpmModule {
    pub fn new(
        events: Receiver<EdgeEvent>,
        telemetry: Telemetry,
        reaction_window_ms: u32,
        report_interval_ms: u32,
    ) -> Self {
        Self {
            events: Some(events),
            reaction_window_ms,
            report_interval_ms: report_interval_ms.max(1),
            next_report_at: 0,
            shared: Arc::new(RpmShared::default()),
            telemetry,
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

/// Pulse loop: owns the timer, publishes through atomics
fn pulse_loop(
    events: Receiver<EdgeEvent>,
    shared: Arc<RpmShared>,
    shutdown: Arc<AtomicBool>,
    reaction_window_ms: u32,
) {
    let mut timer = PulseTimer::new(reaction_window_ms);
    while !shutdown.load(Ordering::Relaxed) {
        let event = match events.recv_timeout(Duration::from_millis(IDLE_POLL_MS)) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        // Pulses are falling edges; the rising flank is not an event
        if event.polarity != EdgePolarity::Falling {
            continue;
        }
        if timer.on_pulse(event.at_us / 1000) {
            shared
                .smoothed_rpm
                .store(timer.smoothed_rpm(), Ordering::Relaxed);
            if let Some(last) = timer.last_pulse_ms() {
                shared.last_pulse_ms.store(last, Ordering::Relaxed);
                shared.seen_pulse.store(true, Ordering::Relaxed);
            }
        }
    }
    log::info!("RPM pulse thread exiting");
}

impl Module for RpmModule {
    fn name(&self) -> &'static str {
        "rpm"
    }

    fn setup(&mut self) -> Result<()> {
        let events = self
            .events
            .take()
            .ok_or_else(|| Error::Other("rpm setup ran twice".into()))?;
        let shared = Arc::clone(&self.shared);
        let shutdown = Arc::clone(&self.shutdown);
        let window = self.reaction_window_ms;
        let handle = thread::Builder::new()
            .name("rpm-pulse".to_string())
            .spawn(move || pulse_loop(events, shared, shutdown, window))
            .map_err(|e| Error::Other(format!("Failed to spawn pulse thread: {}", e)))?;
        self.worker = Some(handle);
        self.telemetry.send_line("RI Rpm ready");
        Ok(())
    }

    fn tick(&mut self, now_ms: u64) {
        if now_ms < self.next_report_at {
            return;
        }
        self.next_report_at = now_ms + self.report_interval_ms as u64;

        let last_pulse = self
            .shared
            .seen_pulse
            .load(Ordering::Relaxed)
            .then(|| self.shared.last_pulse_ms.load(Ordering::Relaxed));
        let rpm = decayed_rpm(
            self.shared.smoothed_rpm.load(Ordering::Relaxed),
            last_pulse,
            now_ms,
            self.report_interval_ms as u64,
        );
        if rpm > RPM_REPORT_MAX {
            // They really don't go this fast
            self.telemetry.send_line("RFFF");
        } else {
            self.telemetry.send_line(&format!("R{:03X}", rpm));
        }
    }
}

impl Drop for RpmModule {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::edge::edge_channel;
    use crate::transport::{self, MockTransport};
    use crossbeam_channel::Sender;

    fn rig() -> (RpmModule, Sender<EdgeEvent>, MockTransport) {
        let mock = MockTransport::new();
        let telemetry = Telemetry::new(transport::shared(Box::new(mock.clone())));
        let (tx, rx) = edge_channel();
        let module = RpmModule::new(rx, telemetry, 200, 100);
        (module, tx, mock)
    }

    fn wait_for_rpm(module: &RpmModule, rpm: u32) {
        for _ in 0..200 {
            if module.shared.smoothed_rpm.load(Ordering::Relaxed) == rpm {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!(
            "pulse thread never reached {} rpm (at {})",
            rpm,
            module.shared.smoothed_rpm.load(Ordering::Relaxed)
        );
    }

    #[test]
    fn test_reports_smoothed_rpm_as_hex() {
        let (mut module, tx, mock) = rig();
        module.setup().unwrap();
        mock.clear_written();

        // Pulses 200ms apart: 300 rpm, set directly
        tx.send(EdgeEvent::falling(1_000_000)).unwrap();
        tx.send(EdgeEvent::falling(1_200_000)).unwrap();
        wait_for_rpm(&module, 300);

        module.tick(1250);
        assert_eq!(mock.written_lines(), vec!["R12C"]);
    }

    #[test]
    fn test_out_of_range_reports_fff() {
        let (mut module, tx, mock) = rig();
        module.setup().unwrap();
        mock.clear_written();

        // 8ms apart: instantaneous 7500 rpm smooths to 7200, still above
        // the 0xFFF ceiling
        tx.send(EdgeEvent::falling(1_000_000)).unwrap();
        tx.send(EdgeEvent::falling(1_008_000)).unwrap();
        wait_for_rpm(&module, 7200);

        module.tick(1050);
        assert_eq!(mock.written_lines(), vec!["RFFF"]);
    }

    #[test]
    fn test_stall_reports_decay_not_last_value() {
        let (mut module, tx, mock) = rig();
        module.setup().unwrap();
        mock.clear_written();

        tx.send(EdgeEvent::falling(1_000_000)).unwrap();
        tx.send(EdgeEvent::falling(1_200_000)).unwrap();
        wait_for_rpm(&module, 300);

        // No more pulses: 1500ms after the last one, 30000/1500 = 20 rpm
        module.tick(2700);
        assert_eq!(mock.written_lines(), vec!["R014"]);
    }

    #[test]
    fn test_no_pulses_reports_zero() {
        let (mut module, _tx, mock) = rig();
        module.setup().unwrap();
        mock.clear_written();
        module.tick(100);
        assert_eq!(mock.written_lines(), vec!["R000"]);
    }
}
