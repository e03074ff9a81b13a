//! Configuration for the SarathiIO daemon
//!
//! Loads configuration from a TOML file with the parameters needed to wire
//! the module registry: host serial link, controller gains, decoder pins and
//! report intervals. Protocol timing constants (bit/gap thresholds) are not
//! configuration - they are properties of the wire protocols and live with
//! the decoders.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub host: HostConfig,
    pub device: DeviceConfig,
    #[serde(default)]
    pub helm: HelmConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub rpm: Option<RpmConfig>,
    /// Rangefinder decoder instances, one per input pin
    #[serde(default)]
    pub rangefinder: Vec<RangefinderConfig>,
    #[serde(default)]
    pub ahrs: AhrsConfig,
    #[serde(default)]
    pub imu: ImuConfig,
}

/// Host serial link (command input + telemetry output)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Serial device for the host link, e.g. `/dev/ttyUSB0`
    pub port: String,
    /// Baud rate; the legacy controllers ran reliably at 9600 or 19200
    pub baud: u32,
}

/// Hardware backend selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Backend name. `mock` runs without hardware (motor writes and IMU
    /// samples are simulated); real GPIO/IMU backends register themselves
    /// under their own names.
    pub backend: String,
}

/// Heading controller gains and limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HelmConfig {
    /// Never direct the drive outside [-max_power .. +max_power] percent
    pub max_power: i32,
    /// Estimated speed in mm/s at 100% power; assumed linear for fractions
    pub speed_at_full_power_mm_s: i32,
    pub p_gain: f32,
    pub i_gain: f32,
    pub d_gain: f32,
    /// How often the drive is updated; 0 disables the controller
    pub update_interval_ms: u32,
    /// Effective turning circle (wheel base for a differential drive)
    pub turning_circle_mm: i32,
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            max_power: 50,
            speed_at_full_power_mm_s: 1000,
            p_gain: 1.0,
            i_gain: 0.0,
            d_gain: 0.5,
            update_interval_ms: 50,
            turning_circle_mm: 520,
        }
    }
}

/// Differential drive actuator settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DriveConfig {
    /// Whether the left motor is mounted reversed
    #[serde(default)]
    pub reverse_left: bool,
    /// Whether the right motor is mounted reversed
    #[serde(default)]
    pub reverse_right: bool,
    /// Debug report interval in ms; 0 disables
    #[serde(default)]
    pub report_interval_ms: u32,
}

/// RPM pulse counter settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpmConfig {
    /// Input pin carrying the pulse signal
    pub pin: u8,
    /// Smoothing window in ms; pulses further apart than this reset the
    /// estimate directly
    pub reaction_window_ms: u32,
    /// Report interval in ms
    pub report_interval_ms: u32,
}

impl Default for RpmConfig {
    fn default() -> Self {
        Self {
            pin: 2,
            reaction_window_ms: 200,
            report_interval_ms: 100,
        }
    }
}

/// One rangefinder decoder bound to one input pin
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RangefinderConfig {
    /// Wire protocol: `type1` (48-bit nibble frames) or `type2` (16-bit
    /// frames)
    pub kind: RangefinderKind,
    /// Input pin carrying the PWM signal
    pub pin: u8,
    /// Telemetry report interval in ms
    #[serde(default = "default_rangefinder_report_ms")]
    pub report_interval_ms: u32,
}

fn default_rangefinder_report_ms() -> u32 {
    100
}

/// Rangefinder wire protocol selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangefinderKind {
    Type1,
    Type2,
}

/// Attitude reporting settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AhrsConfig {
    /// Report interval in ms; 0 disables. Default is thrice per second.
    pub report_interval_ms: u32,
}

impl Default for AhrsConfig {
    fn default() -> Self {
        Self {
            report_interval_ms: 333,
        }
    }
}

/// Raw IMU reporting settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImuConfig {
    /// Report interval in ms; 0 disables (the default)
    #[serde(default)]
    pub report_interval_ms: u32,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration for a hardware-free mock rig
    ///
    /// Suitable for testing and development. Production deployments should
    /// use a proper TOML configuration file.
    pub fn mock_defaults() -> Self {
        Self {
            host: HostConfig {
                port: "/dev/ttyUSB0".to_string(),
                baud: 19200,
            },
            device: DeviceConfig {
                backend: "mock".to_string(),
            },
            helm: HelmConfig::default(),
            drive: DriveConfig::default(),
            rpm: Some(RpmConfig::default()),
            rangefinder: vec![RangefinderConfig {
                kind: RangefinderKind::Type2,
                pin: 3,
                report_interval_ms: 100,
            }],
            ahrs: AhrsConfig::default(),
            imu: ImuConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::mock_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::mock_defaults();
        assert_eq!(config.host.port, "/dev/ttyUSB0");
        assert_eq!(config.host.baud, 19200);
        assert_eq!(config.helm.max_power, 50);
        assert_eq!(config.helm.speed_at_full_power_mm_s, 1000);
        assert_eq!(config.rangefinder.len(), 1);
        assert_eq!(config.rangefinder[0].kind, RangefinderKind::Type2);
    }

    #[test]
    fn test_toml_serialization() {
        let config = Config::mock_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[host]"));
        assert!(toml_string.contains("[helm]"));
        assert!(toml_string.contains("[[rangefinder]]"));
        assert!(toml_string.contains("turning_circle_mm = 520"));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[host]
port = "/dev/ttyS3"
baud = 9600

[device]
backend = "mock"

[helm]
max_power = 40
speed_at_full_power_mm_s = 1200
p_gain = 0.8
i_gain = 0.0
d_gain = 0.2
update_interval_ms = 100
turning_circle_mm = 600

[rpm]
pin = 2
reaction_window_ms = 150
report_interval_ms = 200

[[rangefinder]]
kind = "type1"
pin = 4
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.host.port, "/dev/ttyS3");
        assert_eq!(config.helm.max_power, 40);
        assert_eq!(config.helm.update_interval_ms, 100);
        let rpm = config.rpm.unwrap();
        assert_eq!(rpm.reaction_window_ms, 150);
        assert_eq!(config.rangefinder[0].kind, RangefinderKind::Type1);
        // report_interval_ms falls back to its default when omitted
        assert_eq!(config.rangefinder[0].report_interval_ms, 100);
        // drive section is optional
        assert!(!config.drive.reverse_left);
    }
}
