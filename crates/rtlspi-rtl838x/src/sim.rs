//! Register-level simulator for the SPIF block
//!
//! `SimBus` models the controller registers closely enough to exercise
//! the whole driver without hardware: the ready bit, the transfer-length
//! field, and the big-endian byte lanes of the data register. Tests use
//! it to check both the data path and the exact register traffic.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::bus::RegisterBus;
use crate::regs::{
    REG_SFCR, REG_SFCR2, REG_SFCSR, REG_SFDR, REG_SFDR2, SFCR2_SFCMD_OFF, SFCSR_CSB0, SFCSR_CSB1,
    SFCSR_LEN, SFCSR_LEN_OFF, SFCSR_RDY,
};

/// Pattern the simulator drives on undriven byte lanes
///
/// Reads narrower than four bytes leave the low lanes of SFDR floating;
/// filling them with a fixed pattern catches drivers that forget to mask.
const JUNK: u32 = 0x5A5A_5A5A;

/// Simulated SPIF register file
///
/// Written bytes land in a MOSI log and read data is popped from a
/// queued MISO stream, so a test can script the device side of an
/// exchange. Access counters expose how the driver actually drove the
/// registers.
pub struct SimBus {
    sfcr: u32,
    sfcr2: u32,
    sfcsr: u32,
    /// Every byte the driver has shifted out, oldest first
    mosi: Vec<u8>,
    /// Bytes the device will answer with, oldest first
    miso: VecDeque<u8>,
    stuck_busy: bool,
    /// Remaining status polls that report busy before going ready
    busy_polls: u32,
    sfcsr_reads: usize,
    word_accesses: usize,
    byte_accesses: usize,
    cs_writes: Vec<u32>,
}

impl SimBus {
    /// Create a simulator in the controller's reset state
    pub fn new() -> Self {
        Self {
            sfcr: 0,
            // Reset values model a controller set up for fast read
            sfcr2: 0x0B << SFCR2_SFCMD_OFF,
            sfcsr: SFCSR_CSB0 | SFCSR_CSB1,
            mosi: Vec::new(),
            miso: VecDeque::new(),
            stuck_busy: false,
            busy_polls: 0,
            sfcsr_reads: 0,
            word_accesses: 0,
            byte_accesses: 0,
            cs_writes: Vec::new(),
        }
    }

    /// Queue bytes the simulated device will answer reads with
    pub fn queue_miso(&mut self, bytes: &[u8]) {
        self.miso.extend(bytes.iter().copied());
    }

    /// All bytes shifted out so far, oldest first
    pub fn mosi(&self) -> &[u8] {
        &self.mosi
    }

    /// Make the ready bit stay low forever
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Report busy for the next `polls` status reads, then go ready
    pub fn delay_ready(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// Current SFCR value
    pub fn sfcr(&self) -> u32 {
        self.sfcr
    }

    /// Current SFCSR value, without the ready bit
    pub fn sfcsr(&self) -> u32 {
        self.sfcsr
    }

    /// Every value written to SFCSR, oldest first
    pub fn sfcsr_writes(&self) -> &[u32] {
        &self.cs_writes
    }

    /// How many times SFCSR has been read
    pub fn status_reads(&self) -> usize {
        self.sfcsr_reads
    }

    /// Number of (word, byte) accesses to the data register
    pub fn data_access_counts(&self) -> (usize, usize) {
        (self.word_accesses, self.byte_accesses)
    }

    /// Bytes per data-register access under the current length field
    fn transfer_bytes(&self) -> usize {
        (((self.sfcsr & SFCSR_LEN) >> SFCSR_LEN_OFF) + 1) as usize
    }

    fn ready(&mut self) -> bool {
        if self.stuck_busy {
            return false;
        }
        if self.busy_polls > 0 {
            self.busy_polls -= 1;
            return false;
        }
        true
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for SimBus {
    fn read(&mut self, reg: usize) -> u32 {
        match reg {
            REG_SFCR => self.sfcr,
            REG_SFCR2 => self.sfcr2,
            REG_SFCSR => {
                self.sfcsr_reads += 1;
                if self.ready() {
                    self.sfcsr | SFCSR_RDY
                } else {
                    self.sfcsr
                }
            }
            REG_SFDR => {
                let nbytes = self.transfer_bytes();
                if nbytes == 4 {
                    self.word_accesses += 1;
                } else {
                    self.byte_accesses += 1;
                }
                // Device data occupies the top lanes, MSB first; the
                // rest of the word floats
                let mut word = match nbytes {
                    4 => 0,
                    n => JUNK & (u32::MAX >> (8 * n)),
                };
                for i in 0..nbytes {
                    let byte = self.miso.pop_front().unwrap_or(0xFF);
                    word |= u32::from(byte) << (24 - 8 * i);
                }
                word
            }
            REG_SFDR2 => JUNK,
            _ => 0,
        }
    }

    fn write(&mut self, reg: usize, val: u32) {
        match reg {
            REG_SFCR => self.sfcr = val,
            REG_SFCR2 => self.sfcr2 = val,
            REG_SFCSR => {
                self.cs_writes.push(val);
                // The ready bit is read-only status
                self.sfcsr = val & !SFCSR_RDY;
            }
            REG_SFDR => {
                let nbytes = self.transfer_bytes();
                if nbytes == 4 {
                    self.word_accesses += 1;
                } else {
                    self.byte_accesses += 1;
                }
                for i in 0..nbytes {
                    self.mosi.push((val >> (24 - 8 * i)) as u8);
                }
            }
            _ => {}
        }
    }

    fn delay_us(&mut self, _us: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regs::len_codes::{SPI_LEN1, SPI_LEN4};

    #[test]
    fn test_reset_state() {
        let mut bus = SimBus::new();
        assert_eq!(bus.read(REG_SFCR), 0);
        let sfcsr = bus.read(REG_SFCSR);
        assert_ne!(sfcsr & SFCSR_CSB0, 0);
        assert_ne!(sfcsr & SFCSR_CSB1, 0);
        assert_ne!(sfcsr & SFCSR_RDY, 0);
    }

    #[test]
    fn test_word_write_lands_msb_first() {
        let mut bus = SimBus::new();
        bus.write(REG_SFCSR, SPI_LEN4 << SFCSR_LEN_OFF);
        bus.write(REG_SFDR, 0x1122_3344);
        assert_eq!(bus.mosi(), &[0x11, 0x22, 0x33, 0x44]);
        assert_eq!(bus.data_access_counts(), (1, 0));
    }

    #[test]
    fn test_byte_read_floats_low_lanes() {
        let mut bus = SimBus::new();
        bus.queue_miso(&[0xAB]);
        bus.write(REG_SFCSR, SPI_LEN1 << SFCSR_LEN_OFF);
        let word = bus.read(REG_SFDR);
        assert_eq!(word >> 24, 0xAB);
        assert_eq!(word & 0x00FF_FFFF, JUNK & 0x00FF_FFFF);
        assert_eq!(bus.data_access_counts(), (0, 1));
    }

    #[test]
    fn test_exhausted_miso_reads_ones() {
        let mut bus = SimBus::new();
        bus.write(REG_SFCSR, SPI_LEN1 << SFCSR_LEN_OFF);
        assert_eq!(bus.read(REG_SFDR) >> 24, 0xFF);
    }

    #[test]
    fn test_ready_bit_is_not_writable() {
        let mut bus = SimBus::new();
        bus.write(REG_SFCSR, SFCSR_RDY | SFCSR_CSB1);
        assert_eq!(bus.sfcsr() & SFCSR_RDY, 0);
        assert_eq!(bus.sfcsr_writes(), &[SFCSR_RDY | SFCSR_CSB1]);
    }

    #[test]
    fn test_delayed_ready() {
        let mut bus = SimBus::new();
        bus.delay_ready(2);
        assert_eq!(bus.read(REG_SFCSR) & SFCSR_RDY, 0);
        assert_eq!(bus.read(REG_SFCSR) & SFCSR_RDY, 0);
        assert_ne!(bus.read(REG_SFCSR) & SFCSR_RDY, 0);
        assert_eq!(bus.status_reads(), 3);
    }
}
