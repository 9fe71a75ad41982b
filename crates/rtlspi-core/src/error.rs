//! Error types for rtlspi-core
//!
//! This module provides a no_std compatible error type shared by the
//! controller drivers and the code built on top of them.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The controller's ready flag did not assert within the poll budget
    Timeout,
    /// Requested SPI clock cannot be derived from the reference clock
    InvalidSpeed {
        /// The frequency that was asked for, in Hz
        requested_hz: u32,
    },
    /// A transfer descriptor carries both a transmit and a receive buffer
    ConflictingTransfer,
    /// The controller's register window could not be claimed
    ResourceUnavailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "SPI ready wait timed out"),
            Self::InvalidSpeed { requested_hz } => {
                write!(f, "SPI clock of {} Hz is out of range", requested_hz)
            }
            Self::ConflictingTransfer => {
                write!(f, "transfer has both tx and rx buffers set")
            }
            Self::ResourceUnavailable => write!(f, "SPI controller registers unavailable"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
