//! SPI message model
//!
//! A message is an ordered list of unidirectional transfers aimed at one
//! chip-select slot. Designed to avoid allocation - transfers borrow the
//! buffers they move data through.

use crate::error::{Error, Result};

/// Chip-select slot identifier
///
/// The controller drives two chip-select lines; a message targets exactly
/// one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// First chip-select line
    Cs0,
    /// Second chip-select line
    Cs1,
}

impl Slot {
    /// Look up a slot by its line number
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Cs0),
            1 => Some(Self::Cs1),
            _ => None,
        }
    }

    /// The line number of this slot
    pub fn index(self) -> u8 {
        match self {
            Self::Cs0 => 0,
            Self::Cs1 => 1,
        }
    }
}

/// A single unidirectional transfer
///
/// The lifetime parameter `'a` ties the transfer to the buffer it borrows.
/// At most one of `tx`/`rx` may be set; drivers reject a descriptor
/// carrying both with [`Error::ConflictingTransfer`].
pub struct Transfer<'a> {
    /// Data to clock out (write direction)
    pub tx: Option<&'a [u8]>,

    /// Buffer to clock data into (read direction)
    pub rx: Option<&'a mut [u8]>,

    /// Per-transfer clock override in Hz; 0 inherits the message ceiling
    pub speed_hz: u32,
}

impl<'a> Transfer<'a> {
    /// Create a write transfer
    pub fn write(data: &'a [u8]) -> Self {
        Self {
            tx: Some(data),
            rx: None,
            speed_hz: 0,
        }
    }

    /// Create a read transfer
    pub fn read(buf: &'a mut [u8]) -> Self {
        Self {
            tx: None,
            rx: Some(buf),
            speed_hz: 0,
        }
    }

    /// Set a per-transfer clock speed
    pub fn with_speed(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Number of data bytes this transfer moves
    pub fn len(&self) -> usize {
        if let Some(tx) = &self.tx {
            tx.len()
        } else if let Some(rx) = &self.rx {
            rx.len()
        } else {
            0
        }
    }

    /// Returns true if this transfer moves no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if both buffers are set (an invalid descriptor)
    pub fn is_conflicting(&self) -> bool {
        self.tx.is_some() && self.rx.is_some()
    }
}

/// An ordered sequence of transfers addressed to one slot
///
/// The whole message runs under a single chip-select assertion and at a
/// single negotiated clock.
pub struct Message<'m, 'a> {
    /// Transfers to run, in order
    pub transfers: &'m mut [Transfer<'a>],

    /// Target chip-select slot
    pub slot: Slot,

    /// Clock ceiling for transfers without their own speed, in Hz
    pub speed_hz: u32,
}

impl<'m, 'a> Message<'m, 'a> {
    /// Create a message targeting `slot`
    pub fn new(slot: Slot, transfers: &'m mut [Transfer<'a>], speed_hz: u32) -> Self {
        Self {
            transfers,
            slot,
            speed_hz,
        }
    }

    /// Total bytes across all transfers
    pub fn total_bytes(&self) -> usize {
        self.transfers.iter().map(|t| t.len()).sum()
    }
}

/// Outcome of one message
///
/// A driver reports exactly one completion per message it is handed,
/// whether the message succeeded or died partway through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Final message status
    pub status: Result<()>,

    /// Bytes moved by transfers that ran to completion
    pub actual_length: usize,
}

impl Completion {
    /// A successful completion covering `actual_length` bytes
    pub fn ok(actual_length: usize) -> Self {
        Self {
            status: Ok(()),
            actual_length,
        }
    }

    /// A failed completion; `actual_length` covers the transfers that
    /// finished before the failure
    pub fn failed(error: Error, actual_length: usize) -> Self {
        Self {
            status: Err(error),
            actual_length,
        }
    }

    /// Returns true if the message completed without error
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_from_index() {
        assert_eq!(Slot::from_index(0), Some(Slot::Cs0));
        assert_eq!(Slot::from_index(1), Some(Slot::Cs1));
        assert_eq!(Slot::from_index(2), None);
        assert_eq!(Slot::Cs1.index(), 1);
    }

    #[test]
    fn test_transfer_len() {
        let data = [1u8, 2, 3];
        let t = Transfer::write(&data);
        assert_eq!(t.len(), 3);
        assert!(!t.is_empty());
        assert!(!t.is_conflicting());

        let mut buf = [0u8; 7];
        let t = Transfer::read(&mut buf);
        assert_eq!(t.len(), 7);

        let t = Transfer {
            tx: None,
            rx: None,
            speed_hz: 0,
        };
        assert!(t.is_empty());
    }

    #[test]
    fn test_conflicting_transfer() {
        let data = [0u8; 4];
        let mut buf = [0u8; 4];
        let t = Transfer {
            tx: Some(&data),
            rx: Some(&mut buf),
            speed_hz: 0,
        };
        assert!(t.is_conflicting());
    }

    #[test]
    fn test_message_total_bytes() {
        let cmd = [0x9Fu8];
        let mut id = [0u8; 3];
        let mut transfers = [Transfer::write(&cmd), Transfer::read(&mut id)];
        let msg = Message::new(Slot::Cs0, &mut transfers, 1_000_000);
        assert_eq!(msg.total_bytes(), 4);
        assert_eq!(msg.slot, Slot::Cs0);
    }

    #[test]
    fn test_transfer_speed_override() {
        let data = [0u8; 2];
        let t = Transfer::write(&data).with_speed(25_000_000);
        assert_eq!(t.speed_hz, 25_000_000);
    }

    #[test]
    fn test_completion() {
        let done = Completion::ok(16);
        assert!(done.is_ok());
        assert_eq!(done.actual_length, 16);

        let done = Completion::failed(Error::Timeout, 4);
        assert_eq!(done.status, Err(Error::Timeout));
        assert_eq!(done.actual_length, 4);
    }
}
