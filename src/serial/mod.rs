//! # Serial Communication Module
//!
//! Opens the serial stream an S.bus receiver is wired to.
//!
//! This module handles:
//! - Opening the port at 100,000 baud, even parity, two stop bits
//! - Device path auto-detection with a fallback list
//! - Handing the opened stream to the decoder as a byte source
//!
//! Everything past delivering raw bytes (framing, decoding, failsafe) lives
//! in [`crate::sbus`].

use crate::error::{Result, SbusBridgeError};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

pub mod byte_source;

use byte_source::SerialByteSource;

/// S.bus line rate (100,000 baud, a non-standard rate most USB adapters still accept)
pub const SBUS_BAUD_RATE: u32 = 100_000;

/// Default device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters with an S.bus inverter
    "/dev/ttyAMA0", // Raspberry Pi UART, common for direct receiver wiring
];

/// S.bus serial port handler.
///
/// Manages the connection to the receiver; the S.bus signal must already be
/// inverted to normal UART polarity in hardware.
pub struct SbusSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for SbusSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SbusSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SbusSerial {
    /// Open a connection to the S.bus receiver.
    ///
    /// Auto-detects the device by trying common paths.
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sbus_bridge::serial::SbusSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = SbusSerial::open()?;
    ///     Ok(())
    /// }
    /// ```
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS)
    }

    /// Open a connection trying the given device paths in order
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    pub fn open_with_paths(paths: &[&str]) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path) {
                Ok(port) => {
                    info!("Successfully opened S.bus device at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(SbusBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with S.bus line settings
    fn open_port(path: &str) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, SBUS_BAUD_RATE)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::Even)
            .stop_bits(tokio_serial::StopBits::Two)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| SbusBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Convert into the byte source the frame synchronizer reads from
    pub fn into_source(self) -> SerialByteSource {
        SerialByteSource::new(self.port)
    }
}
