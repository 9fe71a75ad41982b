//! rtlspi-core - Core SPI message model for RTL838x-style controllers
//!
//! This crate provides the transfer/message types and the controller
//! boundary trait shared between the hardware drivers and the code that
//! sits on top of them. It is `no_std` compatible for use in embedded
//! environments.
//!
//! # Features
//!
//! - `std` - Enable standard library support (std::error::Error impls)
//!
//! # Example
//!
//! ```ignore
//! use rtlspi_core::{Message, Slot, SpiController, Transfer};
//!
//! fn read_jedec_id<C: SpiController>(spi: &mut C) -> rtlspi_core::Result<[u8; 3]> {
//!     let cmd = [0x9F];
//!     let mut id = [0u8; 3];
//!     let mut transfers = [Transfer::write(&cmd), Transfer::read(&mut id)];
//!     let done = spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));
//!     done.status?;
//!     Ok(id)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod controller;
pub mod error;
pub mod message;

pub use controller::SpiController;
pub use error::{Error, Result};
pub use message::{Completion, Message, Slot, Transfer};
