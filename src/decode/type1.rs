//! Type-1 rangefinder wire protocol decoder
//!
//! The Type-1 controller transmits 48-bit frames (6 bytes, one per sensor
//! head) as 33%/66% duty-cycle PWM. Data is carried in the LOW periods:
//!
//! - LOW < 150us  => bit 1
//! - LOW < 900us  => bit 0
//! - LOW > 900us  => inter-nibble/inter-frame gap
//! - LOW > 2000us => frame boundary
//!
//! Between frames the line idles through a 3500us LOW (frame boundary), a
//! 2000us HIGH, a 1000us LOW (plain gap, arrives with empty state) and a
//! 100us HIGH. Bits are assembled MSB-first; byte index 0..5 maps to
//! channels A, B, C, D, E, H. Raw values are decimetres; >= 0xF0 means no
//! detection.
//!
//! The falling edge records its timestamp; the rising edge classifies the
//! elapsed LOW period. This mirrors re-arming the hardware interrupt for
//! the opposite edge after each event.

use super::channel::{Channel, ChannelReading};
use super::edge::{EdgeEvent, EdgePolarity};
use super::{EdgeDecoder, FrameOutcome};

/// LOW periods longer than this are gaps, not data bits
pub const GAP_MIN_US: u64 = 900;
/// Gaps longer than this end a frame
pub const FRAME_GAP_US: u64 = 2000;
/// Data bits shorter than this decode as 1
pub const BIT_ONE_MAX_US: u64 = 150;

const FRAME_BYTES: usize = 6;

/// Byte position to channel letter. The Type-1 controller reports the
/// A, B, C, D, E and H heads; F and G do not operate in reverse mode.
const BYTE_CHANNELS: [Channel; FRAME_BYTES] = [
    Channel::A,
    Channel::B,
    Channel::C,
    Channel::D,
    Channel::E,
    Channel::H,
];

/// Raw values at or above this mean "no object detected"
const NO_DETECTION_MIN: u8 = 0xF0;

/// Owned decoder state for one Type-1 input pin
#[derive(Debug, Default)]
pub struct Type1Decoder {
    last_fall_us: Option<u64>,
    bits_read: u32,
    /// Current byte, assembled MSB-first
    acc: u8,
    bytes: [u8; FRAME_BYTES],
    /// Bytes completed this frame; may exceed FRAME_BYTES on noise, in
    /// which case the frame is discarded at the boundary
    byte_count: usize,
}

impl Type1Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_frame(&mut self) {
        self.bits_read = 0;
        self.acc = 0;
        self.byte_count = 0;
    }

    fn commit_frame(&self) -> FrameOutcome {
        let readings = self
            .bytes
            .iter()
            .zip(BYTE_CHANNELS)
            .map(|(&raw, channel)| (channel, decode_reading(raw)))
            .collect();
        FrameOutcome::Frame(readings)
    }

    fn classify_low(&mut self, elapsed_us: u64) -> Option<FrameOutcome> {
        if elapsed_us > GAP_MIN_US {
            // A gap must land on a nibble boundary
            if self.bits_read % 4 != 0 {
                self.reset_frame();
                return Some(FrameOutcome::FramingError);
            }
            if elapsed_us > FRAME_GAP_US {
                let outcome = (self.byte_count == FRAME_BYTES).then(|| self.commit_frame());
                self.reset_frame();
                return outcome;
            }
            // Plain gap: nibble state resets, completed bytes stand
            self.bits_read = 0;
            self.acc = 0;
            return None;
        }

        // Data bit
        let bit = u8::from(elapsed_us < BIT_ONE_MAX_US);
        self.acc = (self.acc << 1) | bit;
        self.bits_read += 1;
        if self.bits_read % 8 == 0 {
            if self.byte_count < FRAME_BYTES {
                self.bytes[self.byte_count] = self.acc;
            }
            self.byte_count += 1;
            self.acc = 0;
        }
        None
    }
}

impl EdgeDecoder for Type1Decoder {
    fn on_edge(&mut self, event: EdgeEvent) -> Option<FrameOutcome> {
        match event.polarity {
            EdgePolarity::Falling => {
                self.last_fall_us = Some(event.at_us);
                None
            }
            EdgePolarity::Rising => {
                let fall = self.last_fall_us?;
                let elapsed = event.at_us.saturating_sub(fall);
                self.classify_low(elapsed)
            }
        }
    }
}

fn decode_reading(raw: u8) -> ChannelReading {
    let distance_cm = if raw >= NO_DETECTION_MIN {
        None
    } else {
        // Raw counts are decimetres
        Some(raw as u16 * 10)
    };
    ChannelReading { raw, distance_cm }
}
