//! Error types for the RTL838x driver

use thiserror::Error;

/// Errors from attaching to the controller's register window
#[derive(Debug, Error)]
pub enum Rtl838xError {
    /// Could not open /dev/mem
    #[error("Failed to open /dev/mem: {0}")]
    DevMemOpen(#[source] std::io::Error),

    /// Could not map the register window
    #[error("Failed to map {size} bytes at physical address {address:#x}: {source}")]
    Map {
        /// Physical address of the window
        address: u64,
        /// Requested window size in bytes
        size: usize,
        /// Underlying mmap error
        #[source]
        source: std::io::Error,
    },

    /// The platform can't provide register access
    #[error("Not supported: {0}")]
    NotSupported(&'static str),
}

impl From<Rtl838xError> for rtlspi_core::Error {
    fn from(_err: Rtl838xError) -> Self {
        rtlspi_core::Error::ResourceUnavailable
    }
}

/// Result type for controller attachment
pub type Result<T> = std::result::Result<T, Rtl838xError>;
