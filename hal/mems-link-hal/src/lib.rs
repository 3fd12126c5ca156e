//! MEMS Link Hardware Abstraction Layer
//!
//! This crate defines the peripheral capabilities the serial link needs
//! from a board: a circular DMA receiver, a blocking or DMA-driven
//! transmitter, and the ready-to-send gate between them. Each board
//! support package implements these traits once; the protocol code above
//! stays identical across boards.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  mems-link-core (command dispatch)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mems-link-protocol (framing)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mems-link-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board UART + │       │   DmaRing     │
//! │  DMA driver   │       │ (software)    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`dma::DmaRx`] - Circular DMA reception
//! - [`uart::UartTx`], [`uart::DmaTx`] - Serial transmission

#![no_std]
#![deny(unsafe_code)]

pub mod dma;
pub mod uart;

// Re-export key items at crate root for convenience
pub use dma::{DmaRing, DmaRx, RingReader, RingWriter};
pub use uart::{DmaTx, TxReady, UartConfig, UartError, UartTx};
