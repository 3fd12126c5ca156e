//! Board-agnostic command handling for the MEMS board serial link
//!
//! This crate sits on top of `mems-link-protocol` and contains the parts
//! of a board application that do not depend on the sensors fitted:
//!
//! - Link configuration (device address, presentation string, timeouts)
//! - The command dispatch shell answering the GUI's standard commands
//! - The handler trait through which a board plugs in its own commands

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod dispatch;
pub mod handler;

pub use config::{ConfigError, LinkConfig};
pub use dispatch::{Dispatch, Dispatcher, Serviced, StreamingState};
pub use handler::{CommandHandler, HandlerError, HandlerResult};
