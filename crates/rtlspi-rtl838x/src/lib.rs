//! RTL838x SPI flash controller driver
//!
//! The SPI flash controller (SPIF) on Realtek RTL838x switch SoCs is a
//! small memory-mapped block with five registers: clock control, flash
//! geometry, a combined chip-select/status register and two data
//! registers. This crate implements the [`rtlspi_core::SpiController`]
//! contract on top of it.
//!
//! The protocol engine in [`controller`] is generic over a
//! [`bus::RegisterBus`], so the same code drives the real register
//! window (mapped through `/dev/mem` on Linux) and the register
//! simulator in [`sim`] used by tests and the diagnostic tool.
//!
//! # Features
//!
//! - `std` - Memory-mapped hardware access and richer error types
//!   (enabled by default)
//! - `alloc` - The register simulator

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod bus;
pub mod controller;
#[cfg(feature = "std")]
pub mod error;
pub mod regs;
#[cfg(feature = "alloc")]
pub mod sim;

pub use bus::RegisterBus;
#[cfg(feature = "std")]
pub use bus::MmioBus;
pub use controller::{divider_code, Rtl838xConfig, Rtl838xSpi};
#[cfg(feature = "std")]
pub use controller::parse_options;
#[cfg(feature = "std")]
pub use error::Rtl838xError;
#[cfg(feature = "alloc")]
pub use sim::SimBus;
