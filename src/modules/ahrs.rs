//! Attitude module (letter `O`)
//!
//! Reads the raw IMU at a fixed 50ms cadence, feeds the external attitude
//! estimator and converts its NWU Euler output into the host-facing NWD
//! frame. The fusion math itself is behind [`AttitudeEstimator`]; this
//! module owns only the cadence, the frame conversion and the reporting.
//!
//! # Host protocol
//!
//! - `OR nnn` set report interval ms (0 = never)
//!
//! Report line: `OR<roll> <pitch> <yaw> <droll> <dpitch> <dyaw>` (degrees
//! and deg/s, NWD).

use crate::core::types::{AttitudeState, ImuSample, Orientation, Rates};
use crate::core::Module;
use crate::error::Result;
use crate::telemetry::Telemetry;
use std::sync::{Arc, Mutex};

/// Fusion update cadence. The estimator contract assumes this period.
pub const IMU_SAMPLE_INTERVAL_MS: u64 = 50;

/// Raw IMU access contract. Implementations own the bus and calibration;
/// `read` must populate gyro, acceleration and magnetic vectors in NWU.
pub trait ImuSource: Send {
    /// Probe and configure the sensor. Failure here is fatal at setup.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn read(&mut self) -> Result<ImuSample>;
}

/// Euler angles in degrees, NWU frame, as produced by the fusion algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerNwu {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// External attitude estimator contract: raw NWU vectors in, NWU Euler
/// angles out, once per 50ms sample.
pub trait AttitudeEstimator: Send {
    fn update(&mut self, sample: &ImuSample);
    fn euler(&self) -> EulerNwu;
}

/// Latest raw sample, shared with the raw-IMU report module
pub type SampleShare = Arc<Mutex<ImuSample>>;

/// Attitude module
pub struct AhrsModule {
    imu: Box<dyn ImuSource>,
    estimator: Box<dyn AttitudeEstimator>,
    attitude: Arc<AttitudeState>,
    sample_share: SampleShare,
    telemetry: Telemetry,
    report_interval_ms: u32,
    next_sample_at: u64,
    next_report_at: u64,
}

impl AhrsModule {
    pub fn new(
        imu: Box<dyn ImuSource>,
        estimator: Box<dyn AttitudeEstimator>,
        attitude: Arc<AttitudeState>,
        sample_share: SampleShare,
        telemetry: Telemetry,
        report_interval_ms: u32,
    ) -> Self {
        Self {
            imu,
            estimator,
            attitude,
            sample_share,
            telemetry,
            report_interval_ms,
            next_sample_at: 0,
            next_report_at: 0,
        }
    }

    fn report(&self) {
        let o = self.attitude.orientation();
        let r = self.attitude.rates();
        self.telemetry.send_line(&format!(
            "OR{} {} {} {} {} {}",
            o.roll, o.pitch, o.yaw, r.roll_rate, r.pitch_rate, r.yaw_rate
        ));
    }
}

impl Module for AhrsModule {
    fn name(&self) -> &'static str {
        "ahrs"
    }

    fn setup(&mut self) -> Result<()> {
        self.imu.init()?;
        self.telemetry.send_line("OI Ahrs ready");
        Ok(())
    }

    fn tick(&mut self, now_ms: u64) {
        if now_ms < self.next_sample_at {
            return;
        }
        self.next_sample_at = now_ms + IMU_SAMPLE_INTERVAL_MS;

        let sample = match self.imu.read() {
            Ok(sample) => sample,
            Err(e) => {
                // Degrade gracefully: keep the last published attitude
                log::warn!("IMU read failed: {}", e);
                return;
            }
        };
        self.estimator.update(&sample);
        let euler = self.estimator.euler();

        // NWU -> NWD: pitch and yaw flip handedness, yaw wraps to
        // [0, 360) clockwise of magnetic north
        let orientation = Orientation {
            roll: euler.roll as i32,
            pitch: -euler.pitch as i32,
            yaw: (540 - euler.yaw as i32).rem_euclid(360),
        };
        let rates = Rates {
            roll_rate: sample.gyro[0] as i32,
            pitch_rate: sample.gyro[1] as i32,
            yaw_rate: -sample.gyro[2] as i32,
        };
        self.attitude.store(orientation, rates);
        if let Ok(mut shared) = self.sample_share.lock() {
            *shared = sample;
        }

        if self.report_interval_ms > 0 && now_ms >= self.next_report_at {
            self.report();
            self.next_report_at = now_ms + self.report_interval_ms as u64;
        }
    }

    fn on_command(&mut self, line: &str) {
        let bytes = line.as_bytes();
        if bytes.first() != Some(&b'O') {
            return; // not for us
        }
        if bytes.get(1) == Some(&b'R') {
            if let Ok(interval) = line[2..].trim().parse::<u32>() {
                self.report_interval_ms = interval.min(60_000);
                log::info!("Ahrs report interval now {}ms", self.report_interval_ms);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{self, MockTransport};

    struct FixedImu {
        sample: ImuSample,
    }

    impl ImuSource for FixedImu {
        fn read(&mut self) -> Result<ImuSample> {
            Ok(self.sample)
        }
    }

    struct FixedEstimator {
        euler: EulerNwu,
    }

    impl AttitudeEstimator for FixedEstimator {
        fn update(&mut self, _sample: &ImuSample) {}
        fn euler(&self) -> EulerNwu {
            self.euler
        }
    }

    fn rig(euler: EulerNwu, gyro: [f32; 3]) -> (AhrsModule, Arc<AttitudeState>, MockTransport) {
        let mock = MockTransport::new();
        let telemetry = Telemetry::new(transport::shared(Box::new(mock.clone())));
        let attitude = Arc::new(AttitudeState::new());
        let sample = ImuSample {
            gyro,
            accel: [0.0, 0.0, 9.81],
            mag: [0.3, 0.0, 0.4],
        };
        let module = AhrsModule::new(
            Box::new(FixedImu { sample }),
            Box::new(FixedEstimator { euler }),
            Arc::clone(&attitude),
            Arc::new(Mutex::new(ImuSample::zero())),
            telemetry,
            0,
        );
        (module, attitude, mock)
    }

    #[test]
    fn test_nwu_to_nwd_conversion() {
        let (mut module, attitude, _mock) = rig(
            EulerNwu {
                roll: 10.4,
                pitch: 5.9,
                yaw: 90.0,
            },
            [1.2, -2.7, 3.9],
        );
        module.tick(0);

        let o = attitude.orientation();
        assert_eq!(o.roll, 10);
        assert_eq!(o.pitch, -5);
        assert_eq!(o.yaw, 90); // (540 - 90) mod 360

        let r = attitude.rates();
        assert_eq!(r.roll_rate, 1);
        assert_eq!(r.pitch_rate, -2);
        assert_eq!(r.yaw_rate, -3);
    }

    #[test]
    fn test_yaw_wraps_into_range() {
        let (mut module, attitude, _mock) = rig(
            EulerNwu {
                roll: 0.0,
                pitch: 0.0,
                yaw: 350.0,
            },
            [0.0; 3],
        );
        module.tick(0);
        assert_eq!(attitude.orientation().yaw, 190);

        let (mut module, attitude, _mock) = rig(EulerNwu::default(), [0.0; 3]);
        module.tick(0);
        assert_eq!(attitude.orientation().yaw, 180);
    }

    #[test]
    fn test_sample_cadence_is_50ms() {
        let (mut module, attitude, _mock) = rig(
            EulerNwu {
                roll: 45.0,
                pitch: 0.0,
                yaw: 0.0,
            },
            [0.0; 3],
        );
        module.tick(0);
        assert_eq!(attitude.orientation().roll, 45);

        // A second estimator value would only land after the next 50ms
        attitude.store(Orientation::default(), Rates::default());
        module.tick(20);
        assert_eq!(attitude.orientation().roll, 0);
        module.tick(50);
        assert_eq!(attitude.orientation().roll, 45);
    }

    #[test]
    fn test_or_command_enables_reporting() {
        let (mut module, _attitude, mock) = rig(
            EulerNwu {
                roll: 1.0,
                pitch: 2.0,
                yaw: 180.0,
            },
            [0.0; 3],
        );
        module.on_command("OR100");
        module.tick(0);
        assert_eq!(mock.written_lines(), vec!["OR1 -2 0 0 0 0"]);

        // Rate limited: the next report is due at 100ms, samples at 50ms
        module.tick(50);
        assert_eq!(mock.written_lines().len(), 1);
        module.tick(100);
        assert_eq!(mock.written_lines().len(), 2);
    }
}
