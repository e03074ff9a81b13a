//! Shared data types for attitude and raw inertial data
//!
//! Coordinate conventions:
//! - Raw IMU vectors are right-handed North-West-Up (NWU), the frame the
//!   fusion algorithm expects.
//! - Host-facing orientation is aircraft North-West-Down (NWD): +roll =
//!   left wing up, +pitch = nose up, yaw in degrees clockwise of magnetic
//!   north wrapped into [0, 360). The conversion lives in the AHRS module.

use std::sync::atomic::{AtomicI32, Ordering};

/// Host-facing orientation in degrees (NWD)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orientation {
    /// [-180 .. 180], positive = left wing up
    pub roll: i32,
    /// [-180 .. 180], positive = nose up
    pub pitch: i32,
    /// [0 .. 360), clockwise of magnetic north
    pub yaw: i32,
}

/// Orientation rates in deg/s (NWD)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rates {
    pub roll_rate: i32,
    pub pitch_rate: i32,
    /// Positive = turning clockwise
    pub yaw_rate: i32,
}

/// Raw IMU sample in the NWU frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Gyroscope (deg/s)
    pub gyro: [f32; 3],
    /// Accelerometer (m/s^2)
    pub accel: [f32; 3],
    /// Magnetometer (any consistent unit)
    pub mag: [f32; 3],
}

impl ImuSample {
    /// All-zero sample
    pub fn zero() -> Self {
        Self {
            gyro: [0.0; 3],
            accel: [0.0; 3],
            mag: [0.0; 3],
        }
    }
}

impl Default for ImuSample {
    fn default() -> Self {
        Self::zero()
    }
}

/// Shared attitude state, written by the AHRS module each fusion update and
/// read by the heading controller on its own tick.
///
/// All fields are atomics so the reader never sees a locked writer; the two
/// sides run on the same scheduler thread today, but the ownership direction
/// (AHRS writes, Helm reads) is kept explicit.
#[derive(Debug, Default)]
pub struct AttitudeState {
    roll: AtomicI32,
    pitch: AtomicI32,
    yaw: AtomicI32,
    roll_rate: AtomicI32,
    pitch_rate: AtomicI32,
    yaw_rate: AtomicI32,
}

impl AttitudeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new orientation + rates pair
    pub fn store(&self, orientation: Orientation, rates: Rates) {
        self.roll.store(orientation.roll, Ordering::Relaxed);
        self.pitch.store(orientation.pitch, Ordering::Relaxed);
        self.yaw.store(orientation.yaw, Ordering::Relaxed);
        self.roll_rate.store(rates.roll_rate, Ordering::Relaxed);
        self.pitch_rate.store(rates.pitch_rate, Ordering::Relaxed);
        self.yaw_rate.store(rates.yaw_rate, Ordering::Relaxed);
    }

    pub fn orientation(&self) -> Orientation {
        Orientation {
            roll: self.roll.load(Ordering::Relaxed),
            pitch: self.pitch.load(Ordering::Relaxed),
            yaw: self.yaw.load(Ordering::Relaxed),
        }
    }

    pub fn rates(&self) -> Rates {
        Rates {
            roll_rate: self.roll_rate.load(Ordering::Relaxed),
            pitch_rate: self.pitch_rate.load(Ordering::Relaxed),
            yaw_rate: self.yaw_rate.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attitude_state_roundtrip() {
        let state = AttitudeState::new();
        state.store(
            Orientation {
                roll: -10,
                pitch: 5,
                yaw: 350,
            },
            Rates {
                roll_rate: 1,
                pitch_rate: -2,
                yaw_rate: 7,
            },
        );
        assert_eq!(
            state.orientation(),
            Orientation {
                roll: -10,
                pitch: 5,
                yaw: 350
            }
        );
        assert_eq!(state.rates().yaw_rate, 7);
    }
}
