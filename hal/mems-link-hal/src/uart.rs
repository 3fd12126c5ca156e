//! UART serial transmission abstractions
//!
//! Provides the transmit side of the link: a blocking write with a bounded
//! timeout, a DMA-queued write, and the ready-to-send gate that keeps a
//! single transmit buffer in flight.

use portable_atomic::{AtomicBool, Ordering};

/// Error from UART operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// Transmission did not finish within the timeout
    Timeout,
    /// Receive overrun
    Overrun,
    /// Framing error
    Framing,
    /// Noise error
    Noise,
    /// Parity error
    Parity,
    /// A transfer is still in progress
    Busy,
    /// Other error
    Other,
}

/// Blocking UART transmitter
pub trait UartTx {
    /// Write data to the UART
    ///
    /// Blocks until all data has been written, an error occurs, or
    /// `timeout_ms` elapses (reported as [`UartError::Timeout`]).
    fn write_blocking(&mut self, data: &[u8], timeout_ms: u32) -> Result<(), UartError>;
}

/// DMA-driven UART transmitter
///
/// The transfer runs in the background. Implementations must call
/// [`TxReady::complete`] from their transfer-complete interrupt.
pub trait DmaTx {
    /// Hand `data` to the DMA engine and return immediately
    ///
    /// `data` must stay untouched until the transfer completes; callers
    /// use a [`TxReady`] gate to guarantee that.
    fn start_write(&mut self, data: &[u8]) -> Result<(), UartError>;
}

/// Ready-to-send gate shared between the sender and the TX-complete interrupt
///
/// Starts ready. The sender claims it before starting a transfer and the
/// interrupt releases it when the peripheral is done reading the buffer.
#[derive(Debug)]
pub struct TxReady(AtomicBool);

impl Default for TxReady {
    fn default() -> Self {
        Self::new()
    }
}

impl TxReady {
    /// Create a gate in the ready state
    pub const fn new() -> Self {
        Self(AtomicBool::new(true))
    }

    /// Check whether a new transfer may start
    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark a transfer as in flight
    pub fn claim(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Mark the in-flight transfer as finished
    ///
    /// Called from the transfer-complete interrupt.
    pub fn complete(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// UART configuration
#[derive(Debug, Clone, Copy)]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: 921_600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}
