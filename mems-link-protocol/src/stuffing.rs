//! Byte stuffing
//!
//! Reserved values:
//! - `EOF` (0xF0): frame terminator, never sent unescaped inside a frame
//! - `BS` (0xF1): escape marker
//! - `BS_EOF` (0xF2): escaped form of a literal `EOF`
//!
//! A byte below `EOF` is sent as is. `EOF` becomes `BS BS_EOF`. A byte at
//! or above `BS` becomes `BS` followed by `byte - BS`, which always lands
//! in `0x00..=0x0E`.

/// Frame terminator
pub const EOF: u8 = 0xF0;

/// Escape marker
pub const BS: u8 = 0xF1;

/// Escaped literal `EOF`
pub const BS_EOF: u8 = 0xF2;

/// Largest value that can follow `BS` as a re-biased byte
const MAX_ESCAPE_OFFSET: u8 = u8::MAX - BS;

/// One payload byte in its on-wire form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stuffed {
    bytes: [u8; 2],
    len: u8,
}

impl Stuffed {
    /// The wire bytes (one or two)
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of wire bytes
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True if the byte needed an escape sequence
    pub fn is_escaped(&self) -> bool {
        self.len == 2
    }
}

/// Stuff a single payload byte
pub fn stuff_byte(byte: u8) -> Stuffed {
    match byte {
        EOF => Stuffed {
            bytes: [BS, BS_EOF],
            len: 2,
        },
        b if b >= BS => Stuffed {
            bytes: [BS, b - BS],
            len: 2,
        },
        b => Stuffed {
            bytes: [b, 0],
            len: 1,
        },
    }
}

/// Decode one payload byte from the wire
///
/// `current` is the next raw byte and `lookahead` the one after it.
/// Returns the decoded byte and how many raw bytes it used (1 or 2), or
/// `None` when `current` is an escape marker without a valid
/// continuation. `None` means the frame is corrupt.
pub fn unstuff_pair(current: u8, lookahead: u8) -> Option<(u8, usize)> {
    if current != BS {
        return Some((current, 1));
    }

    match lookahead {
        BS_EOF => Some((EOF, 2)),
        // Doubled marker, as sent by older firmware
        BS => Some((BS, 2)),
        offset if offset <= MAX_ESCAPE_OFFSET => Some((BS + offset, 2)),
        _ => None,
    }
}

/// Number of wire bytes needed for `bytes` once stuffed (terminator excluded)
pub fn stuffed_len(bytes: &[u8]) -> usize {
    bytes.iter().map(|&b| stuff_byte(b).len()).sum()
}
