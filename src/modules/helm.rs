//! Heading controller (letter `H`)
//!
//! Closes the loop between the attitude state and the differential drive:
//! the host commands a course and speed, the helm turns heading error and
//! yaw rate into a saturated power differential. Speed-to-power mapping
//! lives here on purpose - the drive knows only power.
//!
//! # Host protocol
//!
//! - `H0`            stop immediately
//! - `HCccc sss ttt` set course (deg CW of N), speed, turn time ms
//!                   (turn time optional, default 1000)
//! - `HSPx.xx`       set P gain
//! - `HSIx.xx`       set I gain (reserved; the integral term is
//!                   intentionally unimplemented and always contributes 0)
//! - `HSDx.xx`       set D gain
//! - `HSMnnn`        set max power percent
//! - `HSTnnn`        set turning circle mm
//! - `HSCnnn`        set update interval ms (0 disables the helm)
//!
//! Debug output: one `HD` line per controller update.

use crate::config::HelmConfig;
use crate::core::types::AttitudeState;
use crate::core::Module;
use crate::modules::drive::SharedDrive;
use crate::telemetry::Telemetry;
use std::f32::consts::PI;
use std::sync::Arc;

/// Default turn time when a course command omits it
const DEFAULT_TURN_TIME_MS: i32 = 1000;

/// Signed heading error in [-180 .. 180], positive = turn clockwise.
///
/// The +900 keeps the dividend positive for any goal/yaw in [0, 360) so the
/// modulo lands in the expected branch even at the wrap boundary.
pub fn course_error(goal_course: i32, yaw: i32) -> i32 {
    ((goal_course - yaw) + 900).rem_euclid(360) - 180
}

/// Heading controller module
pub struct HelmModule {
    attitude: Arc<AttitudeState>,
    drive: SharedDrive,
    telemetry: Telemetry,
    stopped: bool,
    max_power: i32,
    /// Estimated speed in mm/s at 100% power; assumed linear for fractions
    speed_at_full_power: i32,
    p_gain: f32,
    i_gain: f32,
    d_gain: f32,
    update_interval_ms: u32,
    next_update_at: u64,
    /// [0 .. 360) deg CW of N; the course we have been instructed to follow
    goal_course: i32,
    /// [-100 .. 100], negative is backwards
    goal_speed: i32,
    /// Wheel base for a differential drive
    turning_circle_mm: i32,
    turn_time_ms: i32,
}

impl HelmModule {
    pub fn new(
        config: &HelmConfig,
        attitude: Arc<AttitudeState>,
        drive: SharedDrive,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            attitude,
            drive,
            telemetry,
            stopped: true,
            max_power: config.max_power.clamp(0, 100),
            speed_at_full_power: config.speed_at_full_power_mm_s.max(1),
            p_gain: config.p_gain,
            i_gain: config.i_gain,
            d_gain: config.d_gain,
            update_interval_ms: config.update_interval_ms,
            next_update_at: 0,
            goal_course: 0,
            goal_speed: 0,
            turning_circle_mm: config.turning_circle_mm.max(1),
            turn_time_ms: DEFAULT_TURN_TIME_MS,
        }
    }

    fn set_course_and_speed(&mut self, course: i32, speed: i32, turn_time_ms: i32) {
        self.stopped = false;
        self.goal_course = course.rem_euclid(360);
        self.goal_speed = speed.clamp(-100, 100);
        self.turn_time_ms = if turn_time_ms > 0 {
            turn_time_ms
        } else {
            DEFAULT_TURN_TIME_MS
        };
        log::info!(
            "Helm: course {} speed {} turn time {}ms",
            self.goal_course,
            self.goal_speed,
            self.turn_time_ms
        );
    }

    /// Stop on the next tick. The tick path zeroes the drive for as long as
    /// we stay stopped, so a stop always wins over any stale course.
    fn full_stop(&mut self) {
        self.stopped = true;
        self.next_update_at = 0;
        log::info!("Helm: full stop");
    }

    fn set_powers(&self, left: i32, right: i32) {
        if let Ok(mut drive) = self.drive.lock() {
            drive.set_powers(left, right);
        }
    }

    fn clamp_power(&self, power: i32) -> i32 {
        power.clamp(-self.max_power, self.max_power)
    }

    fn update(&mut self, now_ms: u64) {
        let yaw = self.attitude.orientation().yaw;
        let yaw_rate = self.attitude.rates().yaw_rate;
        let error = course_error(self.goal_course, yaw);

        // Degrees-per-turn-time expressed as an equivalent mm/s differential
        // for this turning circle
        let k = self.turning_circle_mm as f32 * PI * 1000.0 / (360.0 * self.turn_time_ms as f32);
        let p = self.p_gain * error as f32 * k;
        let d = -self.d_gain * yaw_rate as f32 * k;
        let i = 0.0 * self.i_gain; // reserved
        // p, i and d are in mm/s

        let base_power = self.clamp_power(100 * self.goal_speed / self.speed_at_full_power);
        let turn_power =
            self.clamp_power((100.0 * (p + i + d) / self.speed_at_full_power as f32) as i32);
        let left = self.clamp_power(base_power + turn_power);
        let right = self.clamp_power(base_power - turn_power);

        self.telemetry.send_line(&format!(
            "HD Y {} dY/dt {} cErr {} bp {} tp {} lp {} rp {}",
            yaw, yaw_rate, error, base_power, turn_power, left, right
        ));
        self.set_powers(left, right);
        self.next_update_at = now_ms + self.update_interval_ms as u64;
    }
}

impl Module for HelmModule {
    fn name(&self) -> &'static str {
        "helm"
    }

    fn tick(&mut self, now_ms: u64) {
        if self.update_interval_ms == 0 {
            return; // helm is turned off
        }
        if self.stopped {
            self.set_powers(0, 0);
            return;
        }
        if now_ms < self.next_update_at {
            return;
        }
        self.update(now_ms);
    }

    fn on_command(&mut self, line: &str) {
        let bytes = line.as_bytes();
        if bytes.first() != Some(&b'H') {
            return; // not for us
        }
        match bytes.get(1).copied() {
            Some(b'0') => self.full_stop(),
            Some(b'C') => {
                // HCccc sss [ttt]
                let mut fields = line[2..].split_whitespace();
                let Some(Ok(course)) = fields.next().map(str::parse::<i32>) else {
                    return; // bad line format, ignore
                };
                let Some(Ok(speed)) = fields.next().map(str::parse::<i32>) else {
                    return;
                };
                let turn_time = fields
                    .next()
                    .and_then(|f| f.parse::<i32>().ok())
                    .unwrap_or(DEFAULT_TURN_TIME_MS);
                self.set_course_and_speed(course, speed, turn_time);
            }
            Some(b'S') => {
                let value = if line.len() > 3 { &line[3..] } else { "" };
                self.on_setting(bytes.get(2).copied(), value);
            }
            _ => {}
        }
    }
}

impl HelmModule {
    fn on_setting(&mut self, which: Option<u8>, value: &str) {
        let value = value.trim();
        match which {
            Some(b'P') => {
                if let Ok(gain) = value.parse::<f32>() {
                    if gain.is_finite() {
                        self.p_gain = gain.clamp(0.0, 1000.0);
                    }
                }
            }
            Some(b'I') => {
                if let Ok(gain) = value.parse::<f32>() {
                    if gain.is_finite() {
                        self.i_gain = gain.clamp(0.0, 1000.0);
                    }
                }
            }
            Some(b'D') => {
                if let Ok(gain) = value.parse::<f32>() {
                    if gain.is_finite() {
                        self.d_gain = gain.clamp(0.0, 1000.0);
                    }
                }
            }
            Some(b'M') => {
                if let Ok(power) = value.parse::<i32>() {
                    self.max_power = power.clamp(0, 100);
                }
            }
            Some(b'T') => {
                if let Ok(mm) = value.parse::<i32>() {
                    self.turning_circle_mm = mm.clamp(1, 100_000);
                }
            }
            Some(b'C') => {
                if let Ok(interval) = value.parse::<u32>() {
                    self.update_interval_ms = interval.min(60_000);
                }
            }
            _ => {}
        }
    }
}
