//! Type-2 rangefinder wire protocol decoder
//!
//! The Type-2 controller transmits a 16-bit frame for one sensor head every
//! ~33ms. Data is carried in the HIGH periods:
//!
//! - HIGH < 400us => bit 1
//! - HIGH < 800us => bit 0
//! - HIGH > 800us => inter-frame gap
//!
//! Bits shift in from the top of a 16-bit register (first bit on the wire
//! ends up in the low bit). The high byte carries the channel id, masked
//! with 0xF3 to drop the bits that flip with detection state; the low byte
//! is the distance in centimetres, 0xFF meaning no detection.
//!
//! The rising edge records its timestamp; the falling edge classifies the
//! elapsed HIGH period.

use super::channel::{Channel, ChannelReading};
use super::edge::{EdgeEvent, EdgePolarity};
use super::{EdgeDecoder, FrameOutcome};

/// HIGH periods longer than this are gaps, not data bits
pub const GAP_MIN_US: u64 = 800;
/// Data bits shorter than this decode as 1
pub const BIT_ONE_MAX_US: u64 = 400;

const FRAME_BITS: u32 = 16;

/// Bits of the channel id byte that identify the head regardless of
/// detection state
const CHANNEL_ID_MASK: u8 = 0xF3;

/// Raw distance value meaning "no object detected"
const NO_DETECTION: u8 = 0xFF;

/// Owned decoder state for one Type-2 input pin
#[derive(Debug, Default)]
pub struct Type2Decoder {
    last_rise_us: Option<u64>,
    bits_read: u32,
    /// 16-bit frame register, filled from the top
    acc: u16,
}

impl Type2Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn classify_high(&mut self, elapsed_us: u64) -> Option<FrameOutcome> {
        if elapsed_us > GAP_MIN_US {
            let misaligned = self.bits_read % FRAME_BITS != 0;
            self.bits_read = 0;
            self.acc = 0;
            return misaligned.then_some(FrameOutcome::FramingError);
        }

        self.acc >>= 1;
        if elapsed_us < BIT_ONE_MAX_US {
            self.acc |= 0x8000;
        }
        self.bits_read += 1;
        if self.bits_read % FRAME_BITS != 0 {
            return None;
        }

        // Frame complete: one channel reading, committed atomically
        let frame = self.acc;
        self.bits_read = 0;
        self.acc = 0;

        let id = ((frame >> 8) as u8) & CHANNEL_ID_MASK;
        let Some(channel) = channel_for_id(id) else {
            return Some(FrameOutcome::UnknownChannel(id));
        };
        let raw = (frame & 0xFF) as u8;
        let distance_cm = if raw == NO_DETECTION {
            None
        } else {
            Some(raw as u16)
        };
        Some(FrameOutcome::Frame(vec![(
            channel,
            ChannelReading { raw, distance_cm },
        )]))
    }
}

impl EdgeDecoder for Type2Decoder {
    fn on_edge(&mut self, event: EdgeEvent) -> Option<FrameOutcome> {
        match event.polarity {
            EdgePolarity::Rising => {
                self.last_rise_us = Some(event.at_us);
                None
            }
            EdgePolarity::Falling => {
                let rise = self.last_rise_us?;
                let elapsed = event.at_us.saturating_sub(rise);
                self.classify_high(elapsed)
            }
        }
    }
}

/// Masked channel id to channel letter. F and G are untested on real
/// hardware (they do not operate in reverse mode) but decode anyway.
fn channel_for_id(id: u8) -> Option<Channel> {
    match id {
        0x03 => Some(Channel::A),
        0x00 => Some(Channel::B),
        0x01 => Some(Channel::C),
        0x02 => Some(Channel::D),
        0x13 => Some(Channel::E),
        0x10 => Some(Channel::F),
        0x11 => Some(Channel::G),
        0x12 => Some(Channel::H),
        _ => None,
    }
}
