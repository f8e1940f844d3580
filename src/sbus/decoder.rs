//! # S.bus Channel Decoder
//!
//! Interprets one complete 25-byte frame as channel data.

use super::protocol::*;
use thiserror::Error;

/// One extraction step for a channel value.
///
/// A channel's 11 bits can span up to three frame bytes. Each pick takes one
/// data byte, shifts it right, masks it, then shifts the result left into
/// its destination position within the channel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitPick {
    /// Byte offset in the data portion of the frame
    pub byte: u8,
    /// Right shift applied to the data byte
    pub rshift: u8,
    /// Mask applied after the right shift; 0 marks an unused pick
    pub mask: u8,
    /// Left shift into the channel value
    pub lshift: u8,
}

const fn pick(byte: u8, rshift: u8, mask: u8, lshift: u8) -> BitPick {
    BitPick { byte, rshift, mask, lshift }
}

/// Unused third pick for channels assembled from only two bytes
const NONE: BitPick = pick(0, 0, 0x00, 0);

/// S.bus decoder matrix: 16 proportional channels, up to three picks each.
///
/// The picks for one channel target disjoint destination bits, so the OR
/// accumulation order does not matter.
pub const SBUS_DECODER: [[BitPick; 3]; SBUS_PROPORTIONAL_CHANNELS] = [
    /*  0 */ [pick(0, 0, 0xff, 0), pick(1, 0, 0x07, 8), NONE],
    /*  1 */ [pick(1, 3, 0x1f, 0), pick(2, 0, 0x3f, 5), NONE],
    /*  2 */ [pick(2, 6, 0x03, 0), pick(3, 0, 0xff, 2), pick(4, 0, 0x01, 10)],
    /*  3 */ [pick(4, 1, 0x7f, 0), pick(5, 0, 0x0f, 7), NONE],
    /*  4 */ [pick(5, 4, 0x0f, 0), pick(6, 0, 0x7f, 4), NONE],
    /*  5 */ [pick(6, 7, 0x01, 0), pick(7, 0, 0xff, 1), pick(8, 0, 0x03, 9)],
    /*  6 */ [pick(8, 2, 0x3f, 0), pick(9, 0, 0x1f, 6), NONE],
    /*  7 */ [pick(9, 5, 0x07, 0), pick(10, 0, 0xff, 3), NONE],
    /*  8 */ [pick(11, 0, 0xff, 0), pick(12, 0, 0x07, 8), NONE],
    /*  9 */ [pick(12, 3, 0x1f, 0), pick(13, 0, 0x3f, 5), NONE],
    /* 10 */ [pick(13, 6, 0x03, 0), pick(14, 0, 0xff, 2), pick(15, 0, 0x01, 10)],
    /* 11 */ [pick(15, 1, 0x7f, 0), pick(16, 0, 0x0f, 7), NONE],
    /* 12 */ [pick(16, 4, 0x0f, 0), pick(17, 0, 0x7f, 4), NONE],
    /* 13 */ [pick(17, 7, 0x01, 0), pick(18, 0, 0xff, 1), pick(19, 0, 0x03, 9)],
    /* 14 */ [pick(19, 2, 0x3f, 0), pick(20, 0, 0x1f, 6), NONE],
    /* 15 */ [pick(20, 5, 0x07, 0), pick(21, 0, 0xff, 3), NONE],
];

/// Structural frame validation failure.
///
/// Always a soft error: the receiver records a dropped frame and waits for
/// the stream to resynchronize.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Byte 0 did not match the start sentinel
    #[error("bad start byte: 0x{0:02X}")]
    BadStartByte(u8),

    /// Byte 24 did not match the end sentinel
    #[error("bad end byte: 0x{0:02X}")]
    BadEndByte(u8),
}

/// Outcome of decoding one structurally valid frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedFrame {
    /// Normal frame: scaled pulse values and the number that are valid
    Channels {
        values: RcChannels,
        count: usize,
    },

    /// Both the signal-lost and failsafe flags were set; the link is dead
    Failsafe,
}

/// Decode a complete S.bus frame
///
/// # Arguments
///
/// * `frame` - Complete 25-byte frame (start byte, 22 data bytes, flag byte, end byte)
/// * `max_channels` - Consumer capacity; at most `min(max_channels, 18)` channels are decoded
///
/// # Returns
///
/// * `Result<DecodedFrame, FrameError>` - Channel values, a failsafe
///   indication, or a structural error if either sentinel is wrong
///
/// # Examples
///
/// ```
/// use sbus_bridge::sbus::decoder::{decode_frame, DecodedFrame};
///
/// let mut frame = [0u8; 25];
/// frame[0] = 0x0F;
///
/// match decode_frame(&frame, 18).unwrap() {
///     DecodedFrame::Channels { values, count } => {
///         assert_eq!(count, 18);
///         assert_eq!(values[0], 998); // raw 0 scales to 0 / 2 + 998
///     }
///     DecodedFrame::Failsafe => unreachable!(),
/// }
/// ```
pub fn decode_frame(
    frame: &[u8; SBUS_FRAME_SIZE],
    max_channels: usize,
) -> Result<DecodedFrame, FrameError> {
    // Check frame boundary markers to catch out-of-sync streams
    if frame[0] != SBUS_START_BYTE {
        return Err(FrameError::BadStartByte(frame[0]));
    }

    if frame[SBUS_FRAME_SIZE - 1] != SBUS_END_BYTE {
        return Err(FrameError::BadEndByte(frame[SBUS_FRAME_SIZE - 1]));
    }

    let flags = frame[SBUS_FLAG_BYTE];

    // Both bits set means the transmitter itself is reporting the link dead
    if flags & SBUS_FLAG_SIGNAL_LOST != 0 && flags & SBUS_FLAG_FAILSAFE != 0 {
        return Ok(DecodedFrame::Failsafe);
    }

    let count = max_channels.min(SBUS_MAX_CHANNELS);
    let mut values = [0u16; SBUS_MAX_CHANNELS];

    // Run the decoder matrix over the proportional channels
    for channel in 0..count.min(SBUS_PROPORTIONAL_CHANNELS) {
        let mut value: u16 = 0;

        for decode in &SBUS_DECODER[channel] {
            if decode.mask != 0 {
                let mut piece = u16::from(frame[1 + decode.byte as usize]);
                piece >>= decode.rshift;
                piece &= u16::from(decode.mask);
                piece <<= decode.lshift;

                value |= piece;
            }
        }

        // Convert raw 0-2047 to the legacy 998-2021 pulse encoding.
        // Integer division is deliberate; consumers depend on this exact
        // mapping.
        values[channel] = value / 2 + 998;
    }

    // Digital switch channels, if the consumer has room for them
    if count > 17 {
        let ch17 = u16::from(flags & SBUS_FLAG_CHANNEL_17 != 0);
        let ch18 = u16::from(flags & SBUS_FLAG_CHANNEL_18 != 0);
        values[16] = ch17 * 1000 + 998;
        values[17] = ch18 * 1000 + 998;
    }

    Ok(DecodedFrame::Channels { values, count })
}
