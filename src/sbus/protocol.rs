//! # S.bus Protocol Constants and Types
//!
//! Core protocol definitions for the Futaba S.bus serial protocol.

/// S.bus frame size in bytes (start byte + 22 data bytes + flag byte + end byte)
pub const SBUS_FRAME_SIZE: usize = 25;

/// Frame start sentinel (byte 0, always 0x0F)
pub const SBUS_START_BYTE: u8 = 0x0F;

/// Frame end sentinel (byte 24, always 0x00)
pub const SBUS_END_BYTE: u8 = 0x00;

/// Index of the flag byte within the frame
pub const SBUS_FLAG_BYTE: usize = 23;

/// Flag byte bit: digital channel 17
pub const SBUS_FLAG_CHANNEL_17: u8 = 1 << 0;

/// Flag byte bit: digital channel 18
pub const SBUS_FLAG_CHANNEL_18: u8 = 1 << 1;

/// Flag byte bit: receiver has lost RF lock with the transmitter
pub const SBUS_FLAG_SIGNAL_LOST: u8 = 1 << 2;

/// Flag byte bit: transmitter is signalling its failsafe condition
pub const SBUS_FLAG_FAILSAFE: u8 = 1 << 3;

/// Number of 11-bit proportional channels packed into bytes 1-22
pub const SBUS_PROPORTIONAL_CHANNELS: usize = 16;

/// Maximum channels a frame carries (16 proportional + 2 digital)
pub const SBUS_MAX_CHANNELS: usize = 18;

/// Raw channel value range (11-bit: 0-2047)
pub const SBUS_RAW_VALUE_MAX: u16 = 2047;

/// Pulse value for raw 0 (`0 / 2 + 998`)
pub const SBUS_PULSE_MIN: u16 = 998;

/// Pulse value for raw center 1024 (`1024 / 2 + 998`)
pub const SBUS_PULSE_CENTER: u16 = 1510;

/// Pulse value for raw 2047 (`2047 / 2 + 998`)
pub const SBUS_PULSE_MAX: u16 = 2021;

/// RC channels array type (up to 18 pulse values)
pub type RcChannels = [u16; SBUS_MAX_CHANNELS];

/// Published channel snapshot.
///
/// Overwritten whole on every decoded frame; consumers only ever observe a
/// complete report, never a partially updated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcReport {
    /// Decoded pulse values; entries past `channel_count` are not meaningful
    pub channels: RcChannels,

    /// Number of valid channels in this report (0 when the link is in failsafe)
    pub channel_count: usize,

    /// Monotonic timestamp of the frame this report was decoded from, in microseconds
    pub timestamp_us: u64,

    /// True when the transmitter signalled failsafe; `channel_count` is 0
    pub failsafe: bool,
}

impl Default for RcReport {
    fn default() -> Self {
        Self {
            channels: [0; SBUS_MAX_CHANNELS],
            channel_count: 0,
            timestamp_us: 0,
            failsafe: false,
        }
    }
}
