//! Controller trait definitions

use crate::error::Result;
use crate::message::{Completion, Message};

/// A memory-mapped SPI flash controller
///
/// The SPI framework above the driver serializes work and hands a
/// controller one message at a time. Implementations block until the
/// message is done and always report a [`Completion`], even when the
/// message fails partway through.
pub trait SpiController {
    /// Validate and clamp a device's clock ceiling, once at attach time
    ///
    /// Returns the adjusted ceiling the controller will actually honor,
    /// or [`crate::Error::InvalidSpeed`] if the request is below what the
    /// clock divider can reach.
    fn setup(&mut self, max_speed_hz: u32) -> Result<u32>;

    /// The maximum number of bytes a single transfer may carry
    fn max_transfer_size(&self) -> usize;

    /// Run one message to completion
    fn transfer_message(&mut self, message: Message<'_, '_>) -> Completion;
}
