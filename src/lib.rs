//! SarathiIO - real-time control core for a single-board rover controller
//!
//! This library hosts the cooperative scheduler, the host line protocol, the
//! pulse-width decoders and the heading controller that make up the control
//! core. Hardware specifics (GPIO, PWM, IMU registers) stay behind the
//! `MotorOutputs`, `ImuSource` and edge-event seams.

pub mod config;
pub mod core;
pub mod decode;
pub mod devices;
pub mod error;
pub mod line;
pub mod modules;
pub mod telemetry;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
