//! Differential drive actuator and its debug module
//!
//! Power, not speed: the drive applies a percent duty to each motor and
//! leaves the speed-to-power mapping to the heading controller. The
//! hardware seam is [`MotorOutputs`] - one PWM duty and one direction line
//! per side - so the same drive logic serves hoverboard BLDC bridges,
//! wheelchair drivers, or anything with the same two pins per motor.

use crate::core::Module;
use crate::error::Result;
use crate::telemetry::Telemetry;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Settle time after pulling the motor bridges low. Some BLDC drivers need
/// the reset to latch before accepting PWM again.
const MOTOR_RESET_SETTLE_MS: u64 = 1000;

/// Left or right motor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorSide {
    Left,
    Right,
}

/// Hardware seam: one speed (PWM duty) line and one direction line per
/// motor. Implementations wrap whatever GPIO/PWM facility the board has.
pub trait MotorOutputs: Send {
    fn set_direction(&mut self, side: MotorSide, forward: bool);
    /// Duty 0..=255
    fn set_duty(&mut self, side: MotorSide, duty: u8);
}

/// Power actuator contract consumed by the heading controller
pub trait DifferentialDrive: Send {
    /// Apply motor powers in percent, [-100 .. 100]. Magnitude 0 asserts
    /// brake/coast per hardware policy; sign selects direction.
    fn set_powers(&mut self, left: i32, right: i32);

    /// Currently applied powers
    fn powers(&self) -> (i32, i32);

    /// Re-initialize the motor drivers. May block briefly; called at setup
    /// and on an explicit host request, never from the tick path.
    fn reset(&mut self) {}
}

/// Drive shared between the heading controller and the debug module, the
/// same way the legacy controller handed one drive object to both.
pub type SharedDrive = Arc<Mutex<Box<dyn DifferentialDrive>>>;

/// Wrap a drive for shared use
pub fn shared_drive(drive: Box<dyn DifferentialDrive>) -> SharedDrive {
    Arc::new(Mutex::new(drive))
}

/// PWM + direction-pin differential drive
pub struct PwmDrive {
    outputs: Box<dyn MotorOutputs>,
    reverse_left: bool,
    reverse_right: bool,
    current_left: i32,
    current_right: i32,
}

impl PwmDrive {
    pub fn new(outputs: Box<dyn MotorOutputs>, reverse_left: bool, reverse_right: bool) -> Self {
        Self {
            outputs,
            reverse_left,
            reverse_right,
            current_left: 0,
            current_right: 0,
        }
    }

    fn apply(&mut self, side: MotorSide, power: i32, reverse: bool) {
        let forward = if reverse { power < 0 } else { power >= 0 };
        self.outputs.set_direction(side, forward);
        self.outputs.set_duty(side, (255 * power.abs() / 100) as u8);
    }
}

impl DifferentialDrive for PwmDrive {
    fn set_powers(&mut self, left: i32, right: i32) {
        let left = left.clamp(-100, 100);
        let right = right.clamp(-100, 100);
        // Only changed values touch hardware - repeating the same duty
        // glitches some PWM drivers
        if left != self.current_left {
            self.apply(MotorSide::Left, left, self.reverse_left);
            self.current_left = left;
        }
        if right != self.current_right {
            self.apply(MotorSide::Right, right, self.reverse_right);
            self.current_right = right;
        }
    }

    fn powers(&self) -> (i32, i32) {
        (self.current_left, self.current_right)
    }

    fn reset(&mut self) {
        log::info!("Resetting motor drivers");
        self.outputs.set_duty(MotorSide::Left, 0);
        self.outputs.set_duty(MotorSide::Right, 0);
        self.outputs.set_direction(MotorSide::Left, true);
        self.outputs.set_direction(MotorSide::Right, true);
        self.current_left = 0;
        self.current_right = 0;
        // Let the bridge reset latch before any PWM resumes
        thread::sleep(Duration::from_millis(MOTOR_RESET_SETTLE_MS));
    }
}

/// Test drive that records every power command. Shared handles observe the
/// calls while the scheduler owns the drive itself.
#[derive(Clone, Default)]
pub struct RecordingDrive {
    calls: Arc<Mutex<Vec<(i32, i32)>>>,
    current: Arc<Mutex<(i32, i32)>>,
}

impl RecordingDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(i32, i32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<(i32, i32)> {
        self.calls.lock().unwrap().last().copied()
    }
}

impl DifferentialDrive for RecordingDrive {
    fn set_powers(&mut self, left: i32, right: i32) {
        self.calls.lock().unwrap().push((left, right));
        *self.current.lock().unwrap() = (left, right);
    }

    fn powers(&self) -> (i32, i32) {
        *self.current.lock().unwrap()
    }
}

/// Debug module exposing the drive on the host protocol (letter `S`).
///
/// Unlikely to be used in production - the host talks to the helm, not to
/// the drive - but indispensable when commissioning motors.
pub struct DriveModule {
    drive: SharedDrive,
    telemetry: Telemetry,
    report_interval_ms: u32,
    next_report_at: u64,
}

impl DriveModule {
    pub fn new(drive: SharedDrive, telemetry: Telemetry, report_interval_ms: u32) -> Self {
        Self {
            drive,
            telemetry,
            report_interval_ms,
            next_report_at: 0,
        }
    }

    fn report(&self) {
        let Ok(drive) = self.drive.lock() else {
            return;
        };
        let (left, right) = drive.powers();
        self.telemetry.send_line(&format!("SP{} {}", left, right));
    }
}

impl Module for DriveModule {
    fn name(&self) -> &'static str {
        "drive"
    }

    fn setup(&mut self) -> Result<()> {
        if let Ok(mut drive) = self.drive.lock() {
            drive.reset();
        }
        Ok(())
    }

    fn tick(&mut self, now_ms: u64) {
        if self.report_interval_ms == 0 || now_ms < self.next_report_at {
            return;
        }
        self.report();
        self.next_report_at = now_ms + self.report_interval_ms as u64;
    }

    fn on_command(&mut self, line: &str) {
        let bytes = line.as_bytes();
        if bytes.first() != Some(&b'S') {
            return; // not for us
        }
        match bytes.get(1).copied() {
            Some(b'Z') => {
                if let Ok(mut drive) = self.drive.lock() {
                    drive.reset();
                }
            }
            Some(b'R') => {
                if let Ok(interval) = line[2..].trim().parse::<u32>() {
                    self.report_interval_ms = interval.min(60_000);
                    log::info!("Drive report interval now {}ms", self.report_interval_ms);
                }
            }
            Some(b'P') => {
                // SPlr: single-digit power codes 0..9, 5 = stop
                let (left, right) = match (bytes.get(2), bytes.get(3)) {
                    (Some(&l), Some(&r)) if l.is_ascii_digit() && r.is_ascii_digit() => (
                        ((l as i32 - '5' as i32) * 20).clamp(-100, 100),
                        ((r as i32 - '5' as i32) * 20).clamp(-100, 100),
                    ),
                    _ => (0, 0),
                };
                if let Ok(mut drive) = self.drive.lock() {
                    drive.set_powers(left, right);
                }
                self.report();
            }
            _ => {}
        }
    }
}
