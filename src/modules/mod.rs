//! Hardware modules hosted by the scheduler

pub mod ahrs;
pub mod drive;
pub mod helm;
pub mod imu;
pub mod rangefinder;
pub mod rpm;

pub use ahrs::{AhrsModule, AttitudeEstimator, EulerNwu, ImuSource, SampleShare};
pub use drive::{
    shared_drive, DifferentialDrive, DriveModule, MotorOutputs, MotorSide, PwmDrive,
    RecordingDrive, SharedDrive,
};
pub use helm::HelmModule;
pub use imu::ImuModule;
pub use rangefinder::RangefinderModule;
pub use rpm::RpmModule;
