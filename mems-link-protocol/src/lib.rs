//! MEMS board serial protocol
//!
//! This crate implements the framed UART protocol between a sensor board
//! and the PC-side GUI: byte stuffing, the message checksum, reassembly of
//! frames out of a circular DMA buffer, and the transmit path.
//!
//! # Protocol Overview
//!
//! Every message travels as one byte-stuffed frame closed by `EOF`:
//! ```text
//! ┌──────┬────────┬─────┬──────────────┬──────────┬─────┐
//! │ DEST │ SOURCE │ CMD │ PAYLOAD      │ CHECKSUM │ EOF │
//! │ 1B   │ 1B     │ 1B  │ 0–(N-4)B     │ 1B       │0xF0 │
//! └──────┴────────┴─────┴──────────────┴──────────┴─────┘
//! ```
//!
//! Every field before `EOF` is stuffed, so `0xF0` never appears inside a
//! frame. Replies carry the request command with the reply bit (`0x80`) set.

#![no_std]
#![deny(unsafe_code)]

// This must go first so the macros are visible to the other modules
#[macro_use]
mod fmt;

pub mod checksum;
pub mod commands;
pub mod frame;
pub mod message;
pub mod receiver;
pub mod stuffing;
pub mod transport;

pub use commands::Command;
pub use frame::{FrameDecoder, FrameError, MAX_FRAME_LEN};
pub use message::{Msg, DEFAULT_MAX_LEN};
pub use receiver::{Receiver, RxError};
pub use stuffing::{BS, BS_EOF, EOF};
pub use transport::{Link, SendError, Transmitter};
