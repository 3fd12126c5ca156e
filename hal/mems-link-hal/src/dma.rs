//! Circular DMA reception
//!
//! The receive side of the link is a fixed circular buffer that the DMA
//! engine fills in the background. Software only ever reads it, tracking
//! its own read cursor against the hardware write cursor.
//!
//! [`DmaRing`] is a software stand-in for that hardware: one
//! [`RingWriter`] (the interrupt/DMA side) and one [`RingReader`] (the
//! main loop side), handed out together by [`DmaRing::split`].

use portable_atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

/// Circular DMA receiver
///
/// The buffer is written by hardware; implementations expose it read-only.
pub trait DmaRx {
    /// Size of the circular buffer in bytes (non-zero)
    fn capacity(&self) -> usize;

    /// Value of the DMA "remaining transfers" counter
    ///
    /// Counts down from `capacity()` and reloads on wraparound.
    fn remaining(&self) -> usize;

    /// Index of the next byte the DMA engine will write
    fn write_cursor(&self) -> usize {
        let capacity = self.capacity();
        (capacity - self.remaining().min(capacity)) % capacity
    }

    /// Read the byte at `index` (taken modulo `capacity()`)
    fn read(&self, index: usize) -> u8;

    /// Check the peripheral error flag (overrun, noise, framing)
    fn error_pending(&self) -> bool;

    /// Clear the error and restart reception from the start of the buffer
    fn rearm(&mut self);
}

impl<T: DmaRx + ?Sized> DmaRx for &mut T {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn remaining(&self) -> usize {
        (**self).remaining()
    }

    fn write_cursor(&self) -> usize {
        (**self).write_cursor()
    }

    fn read(&self, index: usize) -> u8 {
        (**self).read(index)
    }

    fn error_pending(&self) -> bool {
        (**self).error_pending()
    }

    fn rearm(&mut self) {
        (**self).rearm()
    }
}

/// Software circular DMA buffer
///
/// Models the hardware buffer for host testing and for boards whose UART
/// driver delivers bytes from an interrupt instead of DMA.
#[derive(Debug)]
pub struct DmaRing<const N: usize> {
    buf: [AtomicU8; N],
    head: AtomicUsize,
    error: AtomicBool,
}

impl<const N: usize> Default for DmaRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DmaRing<N> {
    /// Create an empty ring
    pub fn new() -> Self {
        Self {
            buf: core::array::from_fn(|_| AtomicU8::new(0)),
            head: AtomicUsize::new(0),
            error: AtomicBool::new(false),
        }
    }

    /// Split the ring into its producer and consumer halves
    ///
    /// Borrowing `self` mutably guarantees exactly one of each exists.
    pub fn split(&mut self) -> (RingWriter<'_, N>, RingReader<'_, N>) {
        let ring = &*self;
        (RingWriter { ring }, RingReader { ring })
    }
}

/// Producer half of a [`DmaRing`]
///
/// Plays the role of the DMA engine: the only code allowed to store bytes.
#[derive(Debug)]
pub struct RingWriter<'a, const N: usize> {
    ring: &'a DmaRing<N>,
}

impl<const N: usize> RingWriter<'_, N> {
    /// Store one byte at the write cursor and advance it (wrapping)
    pub fn push(&mut self, byte: u8) {
        let head = self.ring.head.load(Ordering::Relaxed);
        self.ring.buf[head].store(byte, Ordering::Relaxed);
        self.ring.head.store((head + 1) % N, Ordering::Release);
    }

    /// Store a run of bytes
    pub fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    /// Raise the peripheral error flag
    pub fn flag_error(&self) {
        self.ring.error.store(true, Ordering::Release);
    }

    /// Current write cursor
    pub fn cursor(&self) -> usize {
        self.ring.head.load(Ordering::Relaxed)
    }
}

/// Consumer half of a [`DmaRing`]
#[derive(Debug)]
pub struct RingReader<'a, const N: usize> {
    ring: &'a DmaRing<N>,
}

impl<const N: usize> DmaRx for RingReader<'_, N> {
    fn capacity(&self) -> usize {
        N
    }

    fn remaining(&self) -> usize {
        N - self.ring.head.load(Ordering::Acquire)
    }

    fn read(&self, index: usize) -> u8 {
        self.ring.buf[index % N].load(Ordering::Relaxed)
    }

    fn error_pending(&self) -> bool {
        self.ring.error.load(Ordering::Acquire)
    }

    /// Restart reception at index 0
    ///
    /// Like the hardware restart, this must not race the producer.
    fn rearm(&mut self) {
        self.ring.head.store(0, Ordering::Release);
        self.ring.error.store(false, Ordering::Release);
    }
}
