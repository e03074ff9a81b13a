//! Raw IMU report module (letter `U`)
//!
//! Reports the latest raw sensor vectors for calibration and logging on the
//! host side. The sample itself is produced by the attitude module's 50ms
//! read; this module only formats and rate-limits.
//!
//! # Host protocol
//!
//! - `UR nnn` set report interval ms (0 = never, the default)
//!
//! Report line: `IR` followed by nine fixed-width signed fields - gyro xyz
//! (deg/s), accel xyz (m/s^2), mag xyz.

use crate::core::Module;
use crate::modules::ahrs::SampleShare;
use crate::telemetry::Telemetry;

/// Raw IMU reporter
pub struct ImuModule {
    sample: SampleShare,
    telemetry: Telemetry,
    report_interval_ms: u32,
    next_report_at: u64,
}

impl ImuModule {
    pub fn new(sample: SampleShare, telemetry: Telemetry, report_interval_ms: u32) -> Self {
        Self {
            sample,
            telemetry,
            report_interval_ms,
            next_report_at: 0,
        }
    }
}

impl Module for ImuModule {
    fn name(&self) -> &'static str {
        "imu"
    }

    fn tick(&mut self, now_ms: u64) {
        if self.report_interval_ms == 0 || now_ms < self.next_report_at {
            return;
        }
        self.next_report_at = now_ms + self.report_interval_ms as u64;

        let Ok(sample) = self.sample.lock().map(|s| *s) else {
            return;
        };
        let mut line = String::with_capacity(2 + 9 * 8);
        line.push_str("IR");
        for value in sample
            .gyro
            .iter()
            .chain(sample.accel.iter())
            .chain(sample.mag.iter())
        {
            line.push_str(&format!("{:8.3}", value));
        }
        self.telemetry.send_line(&line);
    }

    fn on_command(&mut self, line: &str) {
        let bytes = line.as_bytes();
        if bytes.first() != Some(&b'U') {
            return; // not for us
        }
        if bytes.get(1) == Some(&b'R') {
            if let Ok(interval) = line[2..].trim().parse::<u32>() {
                self.report_interval_ms = interval.min(60_000);
                log::info!("IMU report interval now {}ms", self.report_interval_ms);
            }
        }
    }
}
