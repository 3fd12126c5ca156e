//! Board command handler trait
//!
//! The dispatch shell answers the standard commands itself and calls into
//! the board for anything that touches sensors or board services.

use mems_link_protocol::Msg;

/// Why a board could not start streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandlerError {
    /// Sensor or algorithm failed to initialize
    InitFailed,
    /// Sample FIFO could not be restarted
    FifoRestart,
}

/// Outcome of a board-specific command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandlerResult {
    /// The reply message was filled in and should be sent
    Reply,
    /// Answer with a NACK
    Nack,
    /// Command not known to this board
    Unsupported,
}

/// Hooks a board implements to take part in command handling
///
/// Every method has a default so a board only implements what it supports.
pub trait CommandHandler {
    /// Enable the sensors in `sensors` and start sampling
    fn start_streaming(&mut self, sensors: u32) -> Result<(), HandlerError> {
        let _ = sensors;
        Ok(())
    }

    /// Stop sampling and disable all sensors
    fn stop_streaming(&mut self) {}

    /// Set the RTC from a `SetDateTime` payload
    ///
    /// Layout: hours, minutes, seconds, weekday, day, month, year.
    fn set_date_time(&mut self, payload: &[u8]) {
        let _ = payload;
    }

    /// Jump to the bootloader
    ///
    /// Usually does not return on hardware.
    fn enter_dfu(&mut self) {}

    /// Handle any other command addressed to this board
    ///
    /// `reply` already holds the reply header. Return
    /// [`HandlerResult::Reply`] after appending the answer payload.
    fn command<const N: usize>(&mut self, request: &Msg<N>, reply: &mut Msg<N>) -> HandlerResult {
        let _ = (request, reply);
        HandlerResult::Unsupported
    }
}

/// Board with no sensors: answers only the standard commands
impl CommandHandler for () {}
