//! Logical messages
//!
//! A message is the decoded content of one frame: destination, source,
//! command, then command-specific payload. The checksum is not part of it
//! except transiently, between [`checksum::compute_and_add`] and framing or
//! between reassembly and [`checksum::check_and_remove`].
//!
//! [`checksum::compute_and_add`]: crate::checksum::compute_and_add
//! [`checksum::check_and_remove`]: crate::checksum::check_and_remove

use heapless::Vec;

use crate::commands::{reply_code, CMD_NACK};
use crate::frame::FrameError;

/// Maximum message length in bytes
#[cfg(not(feature = "usb-hs"))]
pub const DEFAULT_MAX_LEN: usize = 256;

/// Maximum message length in bytes
#[cfg(feature = "usb-hs")]
pub const DEFAULT_MAX_LEN: usize = 512;

/// Destination, source and command bytes
pub const HEADER_LEN: usize = 3;

/// A message of at most `N` bytes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Msg<const N: usize = DEFAULT_MAX_LEN> {
    data: Vec<u8, N>,
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for Msg<N> {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Msg {{ len: {}, data: {=[u8]:x} }}", self.len(), self.as_slice())
    }
}

impl<const N: usize> Msg<N> {
    /// Create an empty message
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a message from raw bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FrameError> {
        let mut msg = Self::new();
        msg.extend_from_slice(bytes)?;
        Ok(msg)
    }

    /// Create a message holding just a header
    pub fn with_header(destination: u8, source: u8, command: u8) -> Self {
        let mut msg = Self::new();
        msg.set_header(destination, source, command);
        msg
    }

    /// Replace the contents with a bare header
    pub fn set_header(&mut self, destination: u8, source: u8, command: u8) {
        self.data.clear();
        // Only fails for N < HEADER_LEN, which cannot carry a header anyway
        let _ = self.data.extend_from_slice(&[destination, source, command]);
    }

    /// Number of valid bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True when no further byte fits
    pub fn is_full(&self) -> bool {
        self.data.is_full()
    }

    /// Maximum number of bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Destination address (`data[0]`)
    pub fn destination(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Source address (`data[1]`)
    pub fn source(&self) -> Option<u8> {
        self.data.get(1).copied()
    }

    /// Command code (`data[2]`)
    pub fn command(&self) -> Option<u8> {
        self.data.get(2).copied()
    }

    /// Bytes after the header
    pub fn payload(&self) -> &[u8] {
        self.data.get(HEADER_LEN..).unwrap_or(&[])
    }

    /// Append one byte
    pub fn push(&mut self, byte: u8) -> Result<(), FrameError> {
        self.data.push(byte).map_err(|_| FrameError::PayloadTooLarge)
    }

    /// Append a run of bytes; on overflow nothing is appended
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        self.data
            .extend_from_slice(bytes)
            .map_err(|_| FrameError::PayloadTooLarge)
    }

    /// Shorten to `len` bytes (no-op if already shorter)
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Turn a request into the header of its reply, keeping the payload
    ///
    /// The requester becomes the destination, `device` the source, and
    /// the command gets the reply bit.
    pub fn make_reply(&mut self, device: u8) -> Result<(), FrameError> {
        if self.data.len() < HEADER_LEN {
            return Err(FrameError::InvalidFrame);
        }
        self.data[0] = self.data[1];
        self.data[1] = device;
        self.data[2] = reply_code(self.data[2]);
        Ok(())
    }

    /// Turn a request into a NACK addressed back to the requester
    pub fn make_nack(&mut self, device: u8) -> Result<(), FrameError> {
        if self.data.len() < HEADER_LEN {
            return Err(FrameError::InvalidFrame);
        }
        self.data[0] = self.data[1];
        self.data[1] = device;
        self.data[2] = CMD_NACK;
        Ok(())
    }

    /// Append the low `width` bytes of `value`, least significant first
    pub fn push_uint(&mut self, value: u32, width: usize) -> Result<(), FrameError> {
        let bytes = value.to_le_bytes();
        let width = width.min(bytes.len());
        self.extend_from_slice(&bytes[..width])
    }

    /// Append a little-endian `i32`
    pub fn push_i32(&mut self, value: i32) -> Result<(), FrameError> {
        self.extend_from_slice(&value.to_le_bytes())
    }

    /// Append a little-endian `f32`
    pub fn push_f32(&mut self, value: f32) -> Result<(), FrameError> {
        self.extend_from_slice(&value.to_le_bytes())
    }

    /// Read `width` (1–4) little-endian bytes starting at `offset`
    pub fn read_uint(&self, offset: usize, width: usize) -> Option<u32> {
        if width == 0 || width > 4 {
            return None;
        }
        let bytes = self.data.get(offset..offset.checked_add(width)?)?;
        Some(
            bytes
                .iter()
                .rev()
                .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
        )
    }

    /// Read a little-endian `i32` starting at `offset`
    pub fn read_i32(&self, offset: usize) -> Option<i32> {
        self.read_uint(offset, 4).map(|v| v as i32)
    }
}

impl<const N: usize> AsRef<[u8]> for Msg<N> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CMD_PING, DEFAULT_DEVICE_ADDR};

    #[test]
    fn test_header_accessors() {
        let msg: Msg = Msg::from_slice(&[0x32, 0x01, 0x02, 0xAA]).unwrap();
        assert_eq!(msg.destination(), Some(0x32));
        assert_eq!(msg.source(), Some(0x01));
        assert_eq!(msg.command(), Some(0x02));
        assert_eq!(msg.payload(), &[0xAA]);
    }

    #[test]
    fn test_short_message_accessors() {
        let msg: Msg = Msg::from_slice(&[0x32]).unwrap();
        assert_eq!(msg.source(), None);
        assert_eq!(msg.command(), None);
        assert!(msg.payload().is_empty());
    }

    #[test]
    fn test_capacity_enforced() {
        let mut msg = Msg::<4>::new();
        msg.extend_from_slice(&[1, 2, 3, 4]).unwrap();
        assert!(msg.is_full());
        assert_eq!(msg.push(5), Err(FrameError::PayloadTooLarge));
        assert_eq!(msg.len(), 4);
    }

    #[test]
    fn test_make_reply() {
        let mut msg: Msg = Msg::with_header(DEFAULT_DEVICE_ADDR, 0x01, CMD_PING);
        msg.make_reply(DEFAULT_DEVICE_ADDR).unwrap();
        assert_eq!(msg.as_slice(), &[0x01, DEFAULT_DEVICE_ADDR, 0x81]);
    }

    #[test]
    fn test_make_nack() {
        let mut msg: Msg = Msg::from_slice(&[50, 0x02, 0x50, 0x07]).unwrap();
        msg.make_nack(50).unwrap();
        assert_eq!(msg.as_slice(), &[0x02, 50, CMD_NACK, 0x07]);
    }

    #[test]
    fn test_make_reply_needs_header() {
        let mut msg: Msg = Msg::from_slice(&[50, 0x01]).unwrap();
        assert_eq!(msg.make_reply(50), Err(FrameError::InvalidFrame));
    }

    #[test]
    fn test_uint_fields_little_endian() {
        let mut msg: Msg = Msg::with_header(1, 50, 0x08);
        msg.push_uint(0x0403_0201, 4).unwrap();
        msg.push_uint(0xBEEF, 2).unwrap();
        assert_eq!(msg.payload(), &[0x01, 0x02, 0x03, 0x04, 0xEF, 0xBE]);

        assert_eq!(msg.read_uint(3, 4), Some(0x0403_0201));
        assert_eq!(msg.read_uint(7, 2), Some(0xBEEF));
        assert_eq!(msg.read_uint(8, 2), None);
        assert_eq!(msg.read_uint(3, 5), None);
    }

    #[test]
    fn test_signed_and_float_fields() {
        let mut msg: Msg = Msg::new();
        msg.push_i32(-2).unwrap();
        msg.push_f32(1.5).unwrap();
        assert_eq!(msg.read_i32(0), Some(-2));
        assert_eq!(&msg.as_slice()[4..], &1.5f32.to_le_bytes());
    }
}
