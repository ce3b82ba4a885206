//! Frame synchronisation for the RD-03 report stream.
//!
//! In reporting mode the sensor pushes one packet roughly every 100 ms:
//!
//! | offset | size | field                              |
//! |--------|------|------------------------------------|
//! | 0      | 4    | header `F4 F3 F2 F1`               |
//! | 4      | 2    | data length, little endian         |
//! | 6      | 1    | presence flag                      |
//! | 7      | 2    | target range                       |
//! | 9      | 32   | 16 x u16 range-bin energy (unused) |
//! | 41     | 4    | trailer `F8 F7 F6 F5`              |
//!
//! There is no escaping and no checksum, so the decoder anchors on the two
//! signatures as bytes arrive and re-locks on the next header after noise.

use tracing::{debug, trace, warn};

use crate::error::Error;

pub const FRAME_HEADER: [u8; 4] = [0xF4, 0xF3, 0xF2, 0xF1];
pub const FRAME_END: [u8; 4] = [0xF8, 0xF7, 0xF6, 0xF5];

/// Last byte of [`FRAME_HEADER`]; the only byte that can complete a header match.
pub const FH_LAST: u8 = 0xF1;
/// Last byte of [`FRAME_END`]; the only byte that can complete a trailer match.
pub const FE_LAST: u8 = 0xF5;

pub const SOMEONE_OFFSET: usize = 0x06;
pub const RANGE_OFFSET: usize = 0x07;

// length (2) + presence (1) + range (2)
const PAYLOAD_WIDTH: usize = 5;

/// Shortest header-to-trailer span the decoder accepts.
pub const MIN_FRAME_LEN: usize = FRAME_HEADER.len() + FRAME_END.len() + PAYLOAD_WIDTH;

/// Size of a complete reporting-mode packet.
pub const REPORT_FRAME_LEN: usize = 45;

pub const BUFFER_CAPACITY: usize = 512;

/// Payload of the last good frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SensorReading {
    pub someone_present: bool,
    /// First range byte, unscaled.
    pub distance_code: u8,
}

/// Where the decoder is inside the stream.
///
/// A completed frame is never observable as a state: [`FrameDecoder::push`]
/// returns the reading and the decoder is already back in `Searching`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecoderState {
    Searching,
    InFrame { frame_start: usize },
}

/// Byte-at-a-time header/trailer frame decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    capacity: usize,
    state: DecoderState,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_CAPACITY)
    }

    /// A decoder that overflows after `capacity` bytes without a frame.
    /// Capacities below [`MIN_FRAME_LEN`] are raised to it.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_FRAME_LEN);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            state: DecoderState::Searching,
        }
    }

    /// Drop everything accumulated and go back to searching for a header.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::Searching;
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Advance the state machine by one byte.
    ///
    /// Returns `Ok(Some(_))` when this byte completed a valid frame, `Ok(None)`
    /// while more bytes are needed. A full buffer resets the decoder, drops the
    /// byte and reports [`Error::BufferOverflow`]; feeding may continue.
    pub fn push(&mut self, byte: u8) -> Result<Option<SensorReading>, Error> {
        if self.buffer.len() >= self.capacity {
            warn!(capacity = self.capacity, "frame buffer overflow, resynchronising");
            self.reset();
            return Err(Error::BufferOverflow { capacity: self.capacity });
        }
        self.buffer.push(byte);

        match byte {
            FH_LAST => {
                self.on_header_candidate();
                Ok(None)
            }
            FE_LAST => Ok(self.on_trailer_candidate()),
            _ => Ok(None),
        }
    }

    /// Feed a slice, yielding every frame (or overflow) it completes in order.
    ///
    /// Equivalent to calling [`push`](Self::push) for each byte.
    pub fn decode<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Iterator<Item = Result<SensorReading, Error>> + 'a {
        bytes.iter().filter_map(move |&b| self.push(b).transpose())
    }

    fn on_header_candidate(&mut self) {
        if !self.buffer.ends_with(&FRAME_HEADER) {
            return;
        }
        let frame_start = self.buffer.len() - FRAME_HEADER.len();
        if let DecoderState::InFrame { frame_start: previous } = self.state {
            debug!(previous, frame_start, "header superseded before trailer");
        }
        self.state = DecoderState::InFrame { frame_start };
    }

    fn on_trailer_candidate(&mut self) -> Option<SensorReading> {
        if !self.buffer.ends_with(&FRAME_END) {
            return None;
        }
        let DecoderState::InFrame { frame_start } = self.state else {
            trace!(len = self.buffer.len(), "trailer with no header, ignoring");
            return None;
        };
        let span = self.buffer.len() - frame_start;
        if span < MIN_FRAME_LEN {
            trace!(span, "trailer too close to header, ignoring");
            return None;
        }
        if self.buffer[frame_start..frame_start + FRAME_HEADER.len()] != FRAME_HEADER {
            debug!(frame_start, "header re-check failed, discarding candidate frame");
            return None;
        }

        let reading = SensorReading {
            someone_present: self.buffer[frame_start + SOMEONE_OFFSET] != 0,
            distance_code: self.buffer[frame_start + RANGE_OFFSET],
        };
        trace!(?reading, span, "frame decoded");
        self.reset();
        Some(reading)
    }
}

/// Builds reporting-mode packets for tests.
#[cfg(test)]
pub(crate) fn report_frame(presence: u8, range: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(REPORT_FRAME_LEN);
    frame.extend_from_slice(&FRAME_HEADER);
    frame.extend_from_slice(&35u16.to_le_bytes());
    frame.push(presence);
    frame.extend_from_slice(&range.to_le_bytes());
    for bin in 0..16u16 {
        frame.extend_from_slice(&(bin * 3).to_le_bytes());
    }
    frame.extend_from_slice(&FRAME_END);
    frame
}
