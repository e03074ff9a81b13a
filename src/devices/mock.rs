//! Mock hardware backend for hardware-free bring-up and testing

use crate::core::types::ImuSample;
use crate::error::Result;
use crate::modules::ahrs::{AttitudeEstimator, EulerNwu, ImuSource};
use crate::modules::drive::{MotorOutputs, MotorSide};

/// IMU that always reads a fixed sample
pub struct MockImu {
    sample: ImuSample,
}

impl MockImu {
    /// Level, at rest, pointing magnetic north
    pub fn level_north() -> Self {
        Self {
            sample: ImuSample {
                gyro: [0.0; 3],
                accel: [0.0, 0.0, 9.81],
                mag: [0.4, 0.0, 0.5],
            },
        }
    }

    pub fn with_sample(sample: ImuSample) -> Self {
        Self { sample }
    }
}

impl ImuSource for MockImu {
    fn read(&mut self) -> Result<ImuSample> {
        Ok(self.sample)
    }
}

/// Estimator that reports whatever it was last told to - level and
/// north-facing by default. Stands in for the external fusion component.
#[derive(Default)]
pub struct LevelEstimator {
    euler: EulerNwu,
}

impl LevelEstimator {
    pub fn with_euler(euler: EulerNwu) -> Self {
        Self { euler }
    }
}

impl AttitudeEstimator for LevelEstimator {
    fn update(&mut self, _sample: &ImuSample) {}

    fn euler(&self) -> EulerNwu {
        self.euler
    }
}

/// Motor outputs that log instead of toggling pins
pub struct MockMotorOutputs;

impl MotorOutputs for MockMotorOutputs {
    fn set_direction(&mut self, side: MotorSide, forward: bool) {
        log::debug!("Motor {:?}: direction {}", side, if forward { "fwd" } else { "rev" });
    }

    fn set_duty(&mut self, side: MotorSide, duty: u8) {
        log::debug!("Motor {:?}: duty {}", side, duty);
    }
}
