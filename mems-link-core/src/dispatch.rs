//! Command dispatch shell
//!
//! Answers the commands every board understands (ping, presentation
//! string, mode support, streaming start/stop, date and time, DFU) and
//! forwards the rest to the board's [`CommandHandler`].
//!
//! Requests for another address, and requests the board does not know,
//! get no answer at all. The GUI treats a missing answer as a timeout.

use mems_link_hal::{DmaRx, UartTx};
use mems_link_protocol::commands::{reply_code, Command, CMD_NACK};
use mems_link_protocol::message::HEADER_LEN;
use mems_link_protocol::transport::{Link, SendError};
use mems_link_protocol::{Msg, DEFAULT_MAX_LEN};

use crate::config::LinkConfig;
use crate::handler::{CommandHandler, HandlerResult};

/// What to do with a received message
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch<const N: usize = DEFAULT_MAX_LEN> {
    /// Send this reply
    Reply(Msg<N>),
    /// Acted on, nothing to send
    Handled,
    /// Not for us, malformed, or unknown
    Ignored,
}

/// Result of one [`Dispatcher::service`] iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Serviced {
    /// No complete message was waiting
    Idle,
    /// A reply of this many wire bytes was sent
    Replied(usize),
    /// A message was acted on without a reply
    Handled,
    /// A message was received and dropped
    Ignored,
}

/// Data streaming state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamingState {
    active: bool,
    destination: u8,
    sensors: u32,
}

impl StreamingState {
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Address streamed samples are sent to
    pub fn destination(&self) -> u8 {
        self.destination
    }

    /// Sensor mask from the last `StartStreaming`
    pub fn sensors(&self) -> u32 {
        self.sensors
    }

    fn start(&mut self, destination: u8, sensors: u32) {
        self.active = true;
        self.destination = destination;
        self.sensors = sensors;
    }

    fn stop(&mut self) {
        self.active = false;
        self.sensors = 0;
    }
}

/// Per-link command dispatcher
pub struct Dispatcher<H, const N: usize = DEFAULT_MAX_LEN> {
    handler: H,
    config: LinkConfig,
    streaming: StreamingState,
}

impl<H: CommandHandler, const N: usize> Dispatcher<H, N> {
    pub fn new(handler: H, config: LinkConfig) -> Self {
        Self {
            handler,
            config,
            streaming: StreamingState::default(),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn streaming(&self) -> &StreamingState {
        &self.streaming
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Decide how to answer `request`
    pub fn handle(&mut self, request: &Msg<N>) -> Dispatch<N> {
        let device = self.config.device_address;

        let (Some(destination), Some(source), Some(code)) =
            (request.destination(), request.source(), request.command())
        else {
            return Dispatch::Ignored;
        };
        if destination != device {
            return Dispatch::Ignored;
        }

        let mut reply = Msg::with_header(source, device, reply_code(code));
        let bare = request.len() == HEADER_LEN;

        match Command::from_byte(code) {
            Command::Ping if bare => Dispatch::Reply(reply),

            Command::ReadPresentationString if bare => {
                if reply
                    .extend_from_slice(self.config.presentation.as_bytes())
                    .is_err()
                {
                    warn!("Presentation string does not fit in a message");
                    return Dispatch::Ignored;
                }
                Dispatch::Reply(reply)
            }

            Command::CheckModeSupport => match reply.push_i32(self.config.mode_support) {
                Ok(()) => Dispatch::Reply(reply),
                Err(_) => Dispatch::Ignored,
            },

            Command::StartStreaming => {
                let Some(sensors) = request.read_uint(HEADER_LEN, 4) else {
                    return Dispatch::Ignored;
                };
                if let Err(e) = self.handler.start_streaming(sensors) {
                    warn!("Streaming start failed: {:?}", e);
                    return Dispatch::Ignored;
                }
                info!("Streaming to {} (sensors {:#x})", source, sensors);
                self.streaming.start(source, sensors);
                Dispatch::Reply(reply)
            }

            Command::StopStreaming => {
                self.handler.stop_streaming();
                self.streaming.stop();
                info!("Streaming stopped");
                let mut echo = request.clone();
                match echo.make_reply(device) {
                    Ok(()) => Dispatch::Reply(echo),
                    Err(_) => Dispatch::Ignored,
                }
            }

            Command::SetDateTime => {
                self.handler.set_date_time(request.payload());
                Dispatch::Reply(reply)
            }

            Command::EnterDfu if bare => {
                info!("Entering DFU");
                self.handler.enter_dfu();
                Dispatch::Handled
            }

            Command::Ping | Command::ReadPresentationString | Command::EnterDfu => {
                debug!("Command {:#x} with unexpected payload", code);
                Dispatch::Ignored
            }

            _ => match self.handler.command(request, &mut reply) {
                HandlerResult::Reply => Dispatch::Reply(reply),
                HandlerResult::Nack => {
                    reply.set_header(source, device, CMD_NACK);
                    Dispatch::Reply(reply)
                }
                HandlerResult::Unsupported => {
                    debug!("Unsupported command {:#x}", code);
                    Dispatch::Ignored
                }
            },
        }
    }

    /// One main-loop iteration: receive, dispatch, answer
    ///
    /// Dropped frames are logged and reported as [`Serviced::Idle`]; only
    /// a failed reply transmission is an error.
    pub fn service<R: DmaRx, T: UartTx, const TX: usize>(
        &mut self,
        link: &mut Link<'_, R, T, N, TX>,
    ) -> Result<Serviced, SendError> {
        let Some(request) = link.next_message() else {
            return Ok(Serviced::Idle);
        };

        match self.handle(&request) {
            Dispatch::Reply(reply) => link.send(&reply).map(Serviced::Replied),
            Dispatch::Handled => Ok(Serviced::Handled),
            Dispatch::Ignored => Ok(Serviced::Ignored),
        }
    }

    /// Header for the next streamed sample, if streaming
    pub fn streaming_msg(&self) -> Option<Msg<N>> {
        if !self.streaming.active {
            return None;
        }
        Some(Msg::with_header(
            self.streaming.destination,
            self.config.device_address,
            self.config.streaming_command,
        ))
    }
}
