//! Hardware backend selection
//!
//! A backend supplies the three hardware seams the module registry needs:
//! an IMU source, an attitude estimator and the motor output pins. Edge
//! events for the decoders are produced by the backend as well, routed
//! through the [`PinTable`] bound at startup.

pub mod mock;

use crate::config::Config;
use crate::decode::PinTable;
use crate::error::{Error, Result};
use crate::modules::ahrs::{AttitudeEstimator, ImuSource};
use crate::modules::drive::MotorOutputs;

/// Hardware seams provided by a backend
pub struct Backend {
    pub imu: Box<dyn ImuSource>,
    pub estimator: Box<dyn AttitudeEstimator>,
    pub motor_outputs: Box<dyn MotorOutputs>,
}

/// Create the hardware backend named in the configuration
pub fn create_backend(config: &Config) -> Result<Backend> {
    match config.device.backend.as_str() {
        "mock" => Ok(Backend {
            imu: Box::new(mock::MockImu::level_north()),
            estimator: Box::new(mock::LevelEstimator::default()),
            motor_outputs: Box::new(mock::MockMotorOutputs),
        }),
        other => Err(Error::UnknownBackend(other.to_string())),
    }
}

/// Running edge-event producers. Holding this keeps the pin bindings (and
/// with them the decode threads) alive for the life of the daemon.
pub struct EdgeSources {
    _pins: PinTable,
}

/// Hand the bound pin table to the backend's edge sources. The mock backend
/// produces no edges; a GPIO backend takes ownership of the table here and
/// feeds it from its interrupt handlers.
pub fn start_edge_sources(config: &Config, pins: PinTable) -> Result<EdgeSources> {
    match config.device.backend.as_str() {
        "mock" => {
            log::info!("Mock backend: no edge sources, decoders stay idle");
            Ok(EdgeSources { _pins: pins })
        }
        other => Err(Error::UnknownBackend(other.to_string())),
    }
}
