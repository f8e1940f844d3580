//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::sbus::protocol::SBUS_MAX_CHANNELS;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub link: LinkConfig,
    pub telemetry: TelemetryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,
}

/// RC link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Consumer channel capacity; the published channel count never exceeds this
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
}

/// Link statistics logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_poll_interval_us() -> u64 { 1000 }

fn default_max_channels() -> usize { SBUS_MAX_CHANNELS }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_log_interval_ms() -> u64 { 1000 }

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig {
                port: default_serial_port(),
                poll_interval_us: default_poll_interval_us(),
            },
            link: LinkConfig {
                max_channels: default_max_channels(),
            },
            telemetry: TelemetryConfig {
                enabled: default_telemetry_enabled(),
                log_dir: default_log_dir(),
                log_interval_ms: default_log_interval_ms(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(crate::error::SbusBridgeError::Config(
                toml::de::Error::custom("serial port cannot be empty")
            ));
        }

        // The resync gap is 3 ms; polling slower than that would trip it
        if self.serial.poll_interval_us == 0 || self.serial.poll_interval_us > 2000 {
            return Err(crate::error::SbusBridgeError::Config(
                toml::de::Error::custom("poll_interval_us must be between 1 and 2000")
            ));
        }

        if self.link.max_channels == 0 || self.link.max_channels > SBUS_MAX_CHANNELS {
            return Err(crate::error::SbusBridgeError::Config(
                toml::de::Error::custom("max_channels must be between 1 and 18")
            ));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(crate::error::SbusBridgeError::Config(
                toml::de::Error::custom("telemetry log_dir cannot be empty when enabled")
            ));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(crate::error::SbusBridgeError::Config(
                toml::de::Error::custom("log_interval_ms must be between 1 and 60000")
            ));
        }

        Ok(())
    }
}
