//! Transmit path and per-channel link
//!
//! [`Transmitter`] turns a message into a frame inside its own buffer and
//! hands that buffer to the UART. Only one frame is ever in flight: every
//! send path checks the [`TxReady`] gate first, and nothing rewrites the
//! buffer until the transfer-complete interrupt has released it.
//!
//! [`Link`] bundles one channel's receive and transmit state.

use embedded_io_async::{Error as _, ErrorKind};
use mems_link_hal::{DmaRx, DmaTx, TxReady, UartError, UartTx};

use crate::frame::{self, FrameError, MAX_FRAME_LEN};
use crate::message::{Msg, DEFAULT_MAX_LEN};
use crate::receiver::{Receiver, RxError};

/// Transmit buffer size for [`DEFAULT_MAX_LEN`] messages
pub const DEFAULT_TX_LEN: usize = MAX_FRAME_LEN;

/// Blocking transmit timeout used by the board examples
pub const DEFAULT_TX_TIMEOUT_MS: u32 = 5000;

/// Errors from the transmit path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Previous frame still in flight
    Busy,
    /// Message could not be framed
    Frame(FrameError),
    /// Peripheral reported an error (including timeout)
    Uart(UartError),
}

impl From<FrameError> for SendError {
    fn from(e: FrameError) -> Self {
        SendError::Frame(e)
    }
}

impl From<UartError> for SendError {
    fn from(e: UartError) -> Self {
        SendError::Uart(e)
    }
}

/// Owner of the transmit buffer
///
/// `ready` is shared with the transfer-complete interrupt of the UART.
#[derive(Debug)]
pub struct Transmitter<'a, const TX: usize = DEFAULT_TX_LEN> {
    buffer: [u8; TX],
    ready: &'a TxReady,
}

impl<'a, const TX: usize> Transmitter<'a, TX> {
    pub const fn new(ready: &'a TxReady) -> Self {
        Self {
            buffer: [0; TX],
            ready,
        }
    }

    /// Gate guarding the buffer
    pub fn ready(&self) -> &'a TxReady {
        self.ready
    }

    /// Checksum and stuff `msg` into the buffer
    ///
    /// Refused while a DMA transfer may still be reading the buffer.
    fn load<const N: usize>(&mut self, msg: &Msg<N>) -> Result<usize, SendError> {
        if !self.ready.is_ready() {
            return Err(SendError::Busy);
        }
        Ok(frame::encode(msg, &mut self.buffer)?)
    }

    /// Send `msg` with a blocking write
    ///
    /// Returns the number of wire bytes sent. A timeout is reported as
    /// `SendError::Uart(UartError::Timeout)`; nothing is retried. Fails
    /// with [`SendError::Busy`] while a DMA transfer is in flight.
    pub fn send_blocking<T: UartTx + ?Sized, const N: usize>(
        &mut self,
        uart: &mut T,
        msg: &Msg<N>,
        timeout_ms: u32,
    ) -> Result<usize, SendError> {
        let len = self.load(msg)?;
        if let Err(e) = uart.write_blocking(&self.buffer[..len], timeout_ms) {
            warn!("TX failed: {:?}", e);
            return Err(e.into());
        }
        trace!("TX: {} bytes", len);
        Ok(len)
    }

    /// Start a DMA transfer of `msg` if the previous one has finished
    pub fn try_send_dma<T: DmaTx + ?Sized, const N: usize>(
        &mut self,
        uart: &mut T,
        msg: &Msg<N>,
    ) -> Result<usize, SendError> {
        let len = self.load(msg)?;
        self.ready.claim();
        if let Err(e) = uart.start_write(&self.buffer[..len]) {
            warn!("TX DMA start failed: {:?}", e);
            self.ready.complete();
            return Err(e.into());
        }
        trace!("TX DMA: {} bytes", len);
        Ok(len)
    }

    /// Wait for the previous DMA transfer, then start this one
    pub fn send_dma<T: DmaTx + ?Sized, const N: usize>(
        &mut self,
        uart: &mut T,
        msg: &Msg<N>,
    ) -> Result<usize, SendError> {
        while !self.ready.is_ready() {
            core::hint::spin_loop();
        }
        self.try_send_dma(uart, msg)
    }

    /// Send `msg` through an async writer
    ///
    /// Like [`send_blocking`](Self::send_blocking), refused while a DMA
    /// transfer is in flight.
    pub async fn send_async<W: embedded_io_async::Write, const N: usize>(
        &mut self,
        writer: &mut W,
        msg: &Msg<N>,
    ) -> Result<usize, SendError> {
        let len = self.load(msg)?;
        if let Err(e) = writer.write_all(&self.buffer[..len]).await {
            let e = uart_error(e.kind());
            warn!("TX failed: {:?}", e);
            return Err(e.into());
        }
        trace!("TX: {} bytes", len);
        Ok(len)
    }
}

fn uart_error(kind: ErrorKind) -> UartError {
    match kind {
        ErrorKind::TimedOut => UartError::Timeout,
        _ => UartError::Other,
    }
}

/// One framed serial channel
///
/// Owns the receive peripheral, the transmit peripheral, and the protocol
/// state for both directions. Several links can run side by side.
pub struct Link<'a, R, T, const N: usize = DEFAULT_MAX_LEN, const TX: usize = DEFAULT_TX_LEN> {
    rx: R,
    tx: T,
    receiver: Receiver<N>,
    transmitter: Transmitter<'a, TX>,
    timeout_ms: u32,
}

impl<'a, R: DmaRx, T: UartTx, const N: usize, const TX: usize> Link<'a, R, T, N, TX> {
    /// Create a link with the default transmit timeout
    ///
    /// `ready` is the gate of the UART behind `tx`.
    pub fn new(rx: R, tx: T, ready: &'a TxReady) -> Self {
        Self {
            rx,
            tx,
            receiver: Receiver::new(),
            transmitter: Transmitter::new(ready),
            timeout_ms: DEFAULT_TX_TIMEOUT_MS,
        }
    }

    /// Set the blocking transmit timeout
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Arm reception from the start of the buffer
    pub fn start(&mut self) {
        info!("Link started");
        self.rx.rearm();
        self.receiver.reset();
    }

    /// Look for the next complete message
    pub fn poll(&mut self) -> Result<Option<Msg<N>>, RxError> {
        self.receiver.poll(&mut self.rx)
    }

    /// Next message, with every failure read as "nothing yet"
    pub fn next_message(&mut self) -> Option<Msg<N>> {
        self.receiver.next_message(&mut self.rx)
    }

    /// Send `msg` and wait for the write to finish
    pub fn send(&mut self, msg: &Msg<N>) -> Result<usize, SendError> {
        self.transmitter.send_blocking(&mut self.tx, msg, self.timeout_ms)
    }

    pub fn receiver(&self) -> &Receiver<N> {
        &self.receiver
    }

    pub fn tx(&self) -> &T {
        &self.tx
    }

    /// Give the peripherals back
    pub fn release(self) -> (R, T) {
        (self.rx, self.tx)
    }
}
