//! Frame encoding and decoding
//!
//! Frame format:
//! - stuffed message bytes (destination, source, command, payload)
//! - stuffed CHECKSUM (1 byte): makes the message bytes sum to zero
//! - EOF (1 byte): 0xF0 terminator
//!
//! [`encode`] and [`decode`] work on whole frames in linear buffers.
//! [`FrameDecoder`] takes one byte at a time, for receive paths that
//! deliver bytes from an interrupt or a USB endpoint. Circular DMA
//! buffers go through [`Receiver`](crate::receiver::Receiver) instead.

use heapless::Vec;

use crate::checksum;
use crate::message::{Msg, DEFAULT_MAX_LEN};
use crate::stuffing::{stuff_byte, unstuff_pair, BS, EOF};

/// Largest frame a message of `max_len` bytes can produce
///
/// Every byte (checksum included) may need escaping, plus the terminator.
pub const fn max_frame_len(max_len: usize) -> usize {
    2 * max_len + 1
}

/// Maximum complete frame size for [`DEFAULT_MAX_LEN`] messages
pub const MAX_FRAME_LEN: usize = max_frame_len(DEFAULT_MAX_LEN);

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Message exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    InvalidChecksum,
    /// Frame is incomplete (no terminator yet)
    Incomplete,
    /// Escape marker without a valid continuation
    InvalidEscape,
    /// Terminator with no bytes before it
    Empty,
    /// Too much data without a terminator
    Unterminated,
    /// Invalid frame structure
    InvalidFrame,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Encode `msg` into `buffer` as a complete frame
///
/// The checksum is computed on the fly; `msg` is not modified.
/// Returns the number of bytes written.
pub fn encode<const N: usize>(msg: &Msg<N>, buffer: &mut [u8]) -> Result<usize, FrameError> {
    // The receiver must be able to hold the message plus its checksum
    if msg.len() >= N {
        return Err(FrameError::PayloadTooLarge);
    }

    let chk = checksum::checksum(msg.as_slice());
    let mut count = 0;

    for &byte in msg.as_slice().iter().chain(core::iter::once(&chk)) {
        let stuffed = stuff_byte(byte);
        let end = count + stuffed.len();
        buffer
            .get_mut(count..end)
            .ok_or(FrameError::BufferTooSmall)?
            .copy_from_slice(stuffed.as_slice());
        count = end;
    }

    *buffer.get_mut(count).ok_or(FrameError::BufferTooSmall)? = EOF;
    Ok(count + 1)
}

/// Encode `msg` into a heapless Vec
pub fn encode_to_vec<const N: usize, const F: usize>(msg: &Msg<N>) -> Result<Vec<u8, F>, FrameError> {
    let mut buffer = [0u8; F];
    let len = encode(msg, &mut buffer)?;
    let mut vec = Vec::new();
    vec.extend_from_slice(&buffer[..len])
        .map_err(|_| FrameError::BufferTooSmall)?;
    Ok(vec)
}

/// Decode the first frame in `wire`
///
/// Returns the verified message (checksum stripped) and the number of
/// bytes consumed, terminator included.
pub fn decode<const N: usize>(wire: &[u8]) -> Result<(Msg<N>, usize), FrameError> {
    let end = wire
        .iter()
        .position(|&b| b == EOF)
        .ok_or(FrameError::Incomplete)?;

    let mut msg = Msg::new();
    let mut i = 0;
    while i < end {
        // `end` indexes the terminator, so `i + 1` is always in bounds
        let (byte, used) = unstuff_pair(wire[i], wire[i + 1]).ok_or(FrameError::InvalidEscape)?;
        msg.push(byte)?;
        i += used;
    }

    checksum::check_and_remove(&mut msg)?;
    Ok((msg, end + 1))
}

/// State machine for decoding frames one byte at a time
#[derive(Debug, Clone)]
pub struct FrameDecoder<const N: usize = DEFAULT_MAX_LEN> {
    state: DecodeState,
    buffer: Msg<N>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Collecting plain bytes
    Data,
    /// Got an escape marker, waiting for its continuation
    Escape,
    /// Frame already failed, skipping to the next terminator
    Discard,
}

impl<const N: usize> Default for FrameDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameDecoder<N> {
    /// Create a new frame decoder
    pub const fn new() -> Self {
        Self {
            state: DecodeState::Data,
            buffer: Msg::new(),
        }
    }

    /// Reset the decoder state
    pub fn reset(&mut self) {
        self.state = DecodeState::Data;
        self.buffer.clear();
    }

    /// Feed a single byte to the decoder
    ///
    /// Returns `Ok(Some(msg))` when a complete valid frame is decoded,
    /// `Ok(None)` when more bytes are needed, or `Err` on a corrupt frame.
    /// After an error the rest of the frame is skipped silently.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Msg<N>>, FrameError> {
        if byte == EOF {
            let state = self.state;
            let mut msg = core::mem::take(&mut self.buffer);
            self.state = DecodeState::Data;

            return match state {
                DecodeState::Discard => Ok(None),
                DecodeState::Escape => Err(FrameError::InvalidEscape),
                DecodeState::Data => {
                    checksum::check_and_remove(&mut msg)?;
                    Ok(Some(msg))
                }
            };
        }

        match self.state {
            DecodeState::Discard => Ok(None),
            DecodeState::Data if byte == BS => {
                self.state = DecodeState::Escape;
                Ok(None)
            }
            DecodeState::Data => self.store(byte),
            DecodeState::Escape => match unstuff_pair(BS, byte) {
                Some((decoded, _)) => {
                    self.state = DecodeState::Data;
                    self.store(decoded)
                }
                None => self.abandon(FrameError::InvalidEscape),
            },
        }
    }

    /// Feed multiple bytes to the decoder
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Msg<N>>, FrameError> {
        for &byte in bytes {
            if let Some(msg) = self.feed(byte)? {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }

    fn store(&mut self, byte: u8) -> Result<Option<Msg<N>>, FrameError> {
        match self.buffer.push(byte) {
            Ok(()) => Ok(None),
            Err(e) => self.abandon(e),
        }
    }

    fn abandon(&mut self, error: FrameError) -> Result<Option<Msg<N>>, FrameError> {
        self.buffer.clear();
        self.state = DecodeState::Discard;
        Err(error)
    }
}
