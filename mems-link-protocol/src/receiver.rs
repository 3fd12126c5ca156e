//! Message reassembly from a circular DMA buffer
//!
//! The DMA engine fills the receive buffer in the background; the main
//! loop calls [`Receiver::poll`] to pull out whole frames. The receiver
//! only keeps one cursor, `start_of_msg`: the first byte not yet
//! consumed. A frame whose terminator has not arrived yet is left in
//! place and scanned again on the next poll.
//!
//! Corrupt or oversized frames are dropped and the cursor moved past
//! them, so a noisy line never stalls reception.

use mems_link_hal::DmaRx;

use crate::checksum;
use crate::frame::{max_frame_len, FrameError};
use crate::message::{Msg, DEFAULT_MAX_LEN};
use crate::stuffing::{unstuff_pair, EOF};

/// Why a poll produced no message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// Frame dropped: bad escape, too long, empty, or unterminated
    Framing(FrameError),
    /// Frame reassembled but the checksum did not match
    Checksum,
    /// Peripheral error; reception restarted from scratch
    Overrun,
}

impl From<FrameError> for RxError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::InvalidChecksum => RxError::Checksum,
            other => RxError::Framing(other),
        }
    }
}

/// Reassembler state for one receive channel
#[derive(Debug, Clone, Default)]
pub struct Receiver<const N: usize = DEFAULT_MAX_LEN> {
    start_of_msg: usize,
}

impl<const N: usize> Receiver<N> {
    /// Create a receiver reading from the start of the buffer
    pub const fn new() -> Self {
        Self { start_of_msg: 0 }
    }

    /// Index of the first unconsumed byte
    pub fn start_of_msg(&self) -> usize {
        self.start_of_msg
    }

    /// Forget any partial frame and read from index 0
    ///
    /// Call together with re-arming the DMA reception.
    pub fn reset(&mut self) {
        self.start_of_msg = 0;
    }

    /// Look for the next complete frame
    ///
    /// Returns `Ok(Some(msg))` for a verified message (checksum removed),
    /// `Ok(None)` when no complete frame is available yet, or `Err` when a
    /// frame was dropped. Runs in time bounded by the buffer size.
    pub fn poll<R: DmaRx + ?Sized>(&mut self, rx: &mut R) -> Result<Option<Msg<N>>, RxError> {
        if rx.error_pending() {
            warn!("UART error, restarting reception");
            rx.rearm();
            self.reset();
            return Err(RxError::Overrun);
        }

        let capacity = rx.capacity();
        let dma_counter = rx.write_cursor();
        let start = self.start_of_msg % capacity;

        let length = if dma_counter >= start {
            dma_counter - start
        } else {
            capacity + dma_counter - start
        };

        let mut index = start;
        for offset in 0..length {
            if rx.read(index) == EOF {
                return self.reassemble(rx, offset);
            }
            index = (index + 1) % capacity;
        }

        // Longer than any stuffed frame of N bytes can be: line noise
        if length > max_frame_len(N) {
            debug!("No terminator in {} bytes, dropping", length);
            self.start_of_msg = dma_counter;
            return Err(RxError::Framing(FrameError::Unterminated));
        }

        Ok(None)
    }

    /// Like [`poll`](Self::poll), but every failure reads as "no message"
    pub fn next_message<R: DmaRx + ?Sized>(&mut self, rx: &mut R) -> Option<Msg<N>> {
        match self.poll(rx) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Frame dropped: {:?}", e);
                None
            }
        }
    }

    /// Decode the `frame_len` raw bytes starting at `start_of_msg`
    ///
    /// The terminator sits right after them.
    fn reassemble<R: DmaRx + ?Sized>(
        &mut self,
        rx: &R,
        frame_len: usize,
    ) -> Result<Option<Msg<N>>, RxError> {
        let capacity = rx.capacity();
        let mut msg = Msg::new();
        let mut index = self.start_of_msg % capacity;
        let mut consumed = 0;

        while consumed < frame_len {
            let next = (index + 1) % capacity;

            if msg.is_full() {
                self.start_of_msg = index;
                return Err(RxError::Framing(FrameError::PayloadTooLarge));
            }

            let Some((byte, used)) = unstuff_pair(rx.read(index), rx.read(next)) else {
                self.start_of_msg = next;
                return Err(RxError::Framing(FrameError::InvalidEscape));
            };

            msg.push(byte)?;
            index = (index + used) % capacity;
            consumed += used;
        }

        // Skip the terminator
        self.start_of_msg = (index + 1) % capacity;

        checksum::check_and_remove(&mut msg)?;
        trace!("RX: {} byte message", msg.len());
        Ok(Some(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_to_vec;
    use crate::stuffing::BS;
    use heapless::Vec;
    use mems_link_hal::DmaRing;

    fn ping() -> Msg {
        Msg::from_slice(&[0x32, 0x01, 0x01]).unwrap()
    }

    fn wire(msg: &Msg) -> Vec<u8, 64> {
        encode_to_vec(msg).unwrap()
    }

    #[test]
    fn test_nothing_received() {
        let mut ring = DmaRing::<32>::new();
        let (_, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        assert_eq!(receiver.poll(&mut reader), Ok(None));
        assert_eq!(receiver.start_of_msg(), 0);
    }

    #[test]
    fn test_single_frame() {
        let mut ring = DmaRing::<32>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        writer.write(&wire(&ping()));
        assert_eq!(receiver.poll(&mut reader), Ok(Some(ping())));
        assert_eq!(receiver.start_of_msg(), 5);
        assert_eq!(receiver.poll(&mut reader), Ok(None));
    }

    #[test]
    fn test_partial_frame_waits() {
        let mut ring = DmaRing::<32>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        let frame = wire(&ping());
        writer.write(&frame[..2]);
        assert_eq!(receiver.poll(&mut reader), Ok(None));
        assert_eq!(receiver.start_of_msg(), 0);

        writer.write(&frame[2..]);
        assert_eq!(receiver.poll(&mut reader), Ok(Some(ping())));
    }

    #[test]
    fn test_two_frames_in_order() {
        let mut ring = DmaRing::<64>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        let second: Msg = Msg::from_slice(&[0x32, 0x01, 0x02]).unwrap();
        writer.write(&wire(&ping()));
        writer.write(&wire(&second));

        assert_eq!(receiver.poll(&mut reader), Ok(Some(ping())));
        assert_eq!(receiver.poll(&mut reader), Ok(Some(second)));
        assert_eq!(receiver.poll(&mut reader), Ok(None));
    }

    #[test]
    fn test_frame_wraps_buffer_end() {
        let mut ring = DmaRing::<8>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        // Move both cursors to index 6
        writer.write(&[0x01, 0x00, 0x00, 0x00, 0x00, EOF]);
        assert_eq!(receiver.poll(&mut reader), Err(RxError::Checksum));
        assert_eq!(receiver.start_of_msg(), 6);

        let msg: Msg = Msg::from_slice(&[0x32, 0x01, EOF]).unwrap();
        writer.write(&wire(&msg));
        // 32 01 F1 F2 DD F0 lands on indices 6, 7, 0, 1, 2, 3
        assert_eq!(reader.write_cursor(), 4);
        assert_eq!(receiver.poll(&mut reader), Ok(Some(msg)));
        assert_eq!(receiver.start_of_msg(), 4);
    }

    #[test]
    fn test_checksum_error_consumes_frame() {
        let mut ring = DmaRing::<32>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        writer.write(&[0x32, 0x01, 0x01, 0xCD, EOF]);
        assert_eq!(receiver.poll(&mut reader), Err(RxError::Checksum));
        assert_eq!(receiver.start_of_msg(), 5);

        writer.write(&wire(&ping()));
        assert_eq!(receiver.poll(&mut reader), Ok(Some(ping())));
    }

    #[test]
    fn test_escape_before_terminator_resyncs() {
        let mut ring = DmaRing::<32>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        writer.write(&[0x32, BS, EOF]);
        writer.write(&wire(&ping()));

        assert_eq!(
            receiver.poll(&mut reader),
            Err(RxError::Framing(FrameError::InvalidEscape))
        );
        // Cursor now sits on the stray terminator
        assert_eq!(receiver.start_of_msg(), 2);
        assert_eq!(
            receiver.poll(&mut reader),
            Err(RxError::Framing(FrameError::Empty))
        );
        assert_eq!(receiver.poll(&mut reader), Ok(Some(ping())));
    }

    #[test]
    fn test_unterminated_garbage_dropped() {
        let mut ring = DmaRing::<32>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<8>::new();

        // Longest frame for 8 bytes is 17 on the wire
        writer.write(&[0x11; 18]);
        assert_eq!(
            receiver.poll(&mut reader),
            Err(RxError::Framing(FrameError::Unterminated))
        );
        assert_eq!(receiver.start_of_msg(), 18);
    }

    #[test]
    fn test_unterminated_within_limit_kept() {
        let mut ring = DmaRing::<32>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<8>::new();

        writer.write(&[0x11; 17]);
        assert_eq!(receiver.poll(&mut reader), Ok(None));
        assert_eq!(receiver.start_of_msg(), 0);
    }

    #[test]
    fn test_escaped_frame_split_past_message_len() {
        let mut ring = DmaRing::<128>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<64>::new();

        // 40 escaped bytes, a plain checksum and EOF: 82 wire bytes
        let msg = Msg::<64>::from_slice(&[EOF; 40]).unwrap();
        let frame: Vec<u8, 129> = encode_to_vec(&msg).unwrap();
        assert_eq!(frame.len(), 82);

        writer.write(&frame[..70]);
        assert_eq!(receiver.poll(&mut reader), Ok(None));
        assert_eq!(receiver.start_of_msg(), 0);

        writer.write(&frame[70..]);
        assert_eq!(receiver.poll(&mut reader), Ok(Some(msg)));
    }

    #[test]
    fn test_overrun_rearms() {
        let mut ring = DmaRing::<32>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        writer.write(&wire(&ping()));
        writer.write(&[0x32, 0x01]);
        assert_eq!(receiver.poll(&mut reader), Ok(Some(ping())));

        writer.flag_error();
        assert_eq!(receiver.poll(&mut reader), Err(RxError::Overrun));
        assert_eq!(receiver.start_of_msg(), 0);
        assert!(!reader.error_pending());

        writer.write(&wire(&ping()));
        assert_eq!(receiver.poll(&mut reader), Ok(Some(ping())));
    }

    #[test]
    fn test_next_message_hides_errors() {
        let mut ring = DmaRing::<32>::new();
        let (mut writer, mut reader) = ring.split();
        let mut receiver = Receiver::<DEFAULT_MAX_LEN>::new();

        writer.write(&[0x32, 0x01, 0x01, 0x00, EOF]);
        assert_eq!(receiver.next_message(&mut reader), None);
        writer.write(&wire(&ping()));
        assert_eq!(receiver.next_message(&mut reader), Some(ping()));
    }
}
