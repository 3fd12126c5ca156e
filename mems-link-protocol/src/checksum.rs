//! Message checksum
//!
//! One byte, chosen so that all bytes of the message plus the checksum sum
//! to zero modulo 256.

use crate::frame::FrameError;
use crate::message::Msg;

/// Checksum byte for `bytes`
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_sub(b))
}

/// True if `bytes` (checksum included) sums to zero
pub fn verify(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
}

/// Append the checksum to `msg`
pub fn compute_and_add<const N: usize>(msg: &mut Msg<N>) -> Result<(), FrameError> {
    let chk = checksum(msg.as_slice());
    msg.push(chk)
}

/// Verify and strip the trailing checksum of `msg`
///
/// On mismatch `msg` is left as it was.
pub fn check_and_remove<const N: usize>(msg: &mut Msg<N>) -> Result<(), FrameError> {
    if msg.is_empty() {
        return Err(FrameError::Empty);
    }
    if !verify(msg.as_slice()) {
        return Err(FrameError::InvalidChecksum);
    }
    msg.truncate(msg.len() - 1);
    Ok(())
}
