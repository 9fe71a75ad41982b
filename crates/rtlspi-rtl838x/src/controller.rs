//! Driver for the RTL838x SPI flash controller
//!
//! The controller shifts up to four bytes per data-register access and
//! busy-waits on a ready flag between register operations. The driver is
//! generic over [`RegisterBus`] so the protocol engine can run against
//! mapped hardware or the simulator.

use log::{debug, error, info};

use rtlspi_core::error::{Error as CoreError, Result as CoreResult};
use rtlspi_core::{Completion, Message, Slot, SpiController};

#[cfg(feature = "std")]
use crate::bus::MmioBus;
use crate::bus::RegisterBus;
use crate::regs::*;

/// Configuration for attaching to the controller
#[derive(Debug, Clone)]
pub struct Rtl838xConfig {
    /// Physical base address of the SPIF register window
    pub base_addr: u64,
    /// Reference clock feeding the SPI clock divider, in Hz
    pub dram_freq: u32,
}

impl Default for Rtl838xConfig {
    fn default() -> Self {
        Self {
            base_addr: SPIF_BASE,
            dram_freq: DRAM_FREQ,
        }
    }
}

impl Rtl838xConfig {
    /// Set the physical base address of the register window
    pub fn with_base_addr(mut self, base_addr: u64) -> Self {
        self.base_addr = base_addr;
        self
    }

    /// Set the reference clock frequency in Hz
    pub fn with_dram_freq(mut self, dram_freq: u32) -> Self {
        self.dram_freq = dram_freq;
        self
    }
}

/// Parse controller options from key/value pairs
///
/// Supported keys:
/// - `base` - physical base address of the register window (hex with
///   `0x` prefix, or decimal)
/// - `dramfreq` - reference clock in Hz
#[cfg(feature = "std")]
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<Rtl838xConfig, String> {
    let mut config = Rtl838xConfig::default();

    for (key, value) in options {
        match *key {
            "base" => {
                let parsed = if let Some(hex) = value.strip_prefix("0x") {
                    u64::from_str_radix(hex, 16)
                } else {
                    value.parse()
                };
                config.base_addr =
                    parsed.map_err(|_| format!("Invalid base address: {}", value))?;
            }
            "dramfreq" => {
                config.dram_freq = value
                    .parse()
                    .map_err(|_| format!("Invalid DRAM frequency: {}", value))?;
            }
            _ => {
                log::warn!("rtl838x: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

/// Compute the SFCR clock-divider code for a target SPI clock
///
/// The divider only supports even ratios from 2 to 16, so the effective
/// clock is `dram_freq / (2 * (code + 1))` and can come out slightly
/// above `speed_hz` when the exact ratio is odd.
pub fn divider_code(dram_freq: u32, speed_hz: u32) -> CoreResult<u32> {
    if speed_hz == 0 {
        return Err(CoreError::InvalidSpeed { requested_hz: 0 });
    }

    let rate = dram_freq.div_ceil(speed_hz);
    if rate > 16 {
        return Err(CoreError::InvalidSpeed {
            requested_hz: speed_hz,
        });
    }
    let rate = rate.max(2);

    Ok((rate - 2) / 2)
}

fn io_width_name(code: u32) -> &'static str {
    match code {
        io_width::SPI_WIDTH1 => "single",
        io_width::SPI_WIDTH2 => "dual",
        io_width::SPI_WIDTH4 => "quad",
        _ => "reserved",
    }
}

/// RTL838x SPI flash controller
///
/// One instance owns the register window. The controller serializes
/// whole messages: chip select is asserted before the first transfer
/// and released after the last one.
pub struct Rtl838xSpi<B> {
    bus: B,
    dram_freq: u32,
    /// Last negotiated SPI clock, updated by setup and by each message
    speed_hz: u32,
}

#[cfg(feature = "std")]
impl Rtl838xSpi<MmioBus> {
    /// Map the controller's register window and attach to it
    pub fn open(config: &Rtl838xConfig) -> crate::error::Result<Self> {
        debug!(
            "rtl838x: Opening SPIF register window at {:#010x}",
            config.base_addr
        );
        let bus = MmioBus::map(config.base_addr, SPIF_WINDOW_SIZE)?;
        info!(
            "rtl838x: Mapped SPIF window at {:#010x} (reference clock {} Hz)",
            config.base_addr, config.dram_freq
        );
        Ok(Self::with_bus(bus, config.dram_freq))
    }
}

impl<B: RegisterBus> Rtl838xSpi<B> {
    /// Drive the controller through an already attached register bus
    pub fn with_bus(bus: B, dram_freq: u32) -> Self {
        Self {
            bus,
            dram_freq,
            speed_hz: dram_freq / 2,
        }
    }

    /// The register bus behind this controller
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable access to the register bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Last negotiated SPI clock in Hz
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }

    /// Reference clock feeding the divider, in Hz
    pub fn dram_freq(&self) -> u32 {
        self.dram_freq
    }

    #[inline(always)]
    fn read_reg(&mut self, reg: usize) -> u32 {
        self.bus.read(reg)
    }

    #[inline(always)]
    fn write_reg(&mut self, reg: usize, val: u32) {
        self.bus.write(reg, val);
    }

    /// Poll SFCSR until the controller reports ready
    ///
    /// Gives up after [`WAIT_MAX_LOOP`] polls of roughly a microsecond
    /// each.
    fn wait_ready(&mut self) -> CoreResult<()> {
        for _ in 0..WAIT_MAX_LOOP {
            if self.read_reg(REG_SFCSR) & SFCSR_RDY != 0 {
                return Ok(());
            }
            self.bus.delay_us(1);
        }

        let status = self.read_reg(REG_SFCSR);
        error!("rtl838x: ready wait timed out (SFCSR: {:#010x})", status);
        Err(CoreError::Timeout)
    }

    /// Program the clock divider for `speed_hz`, leaving the rest of
    /// SFCR untouched
    fn prepare(&mut self, speed_hz: u32) -> CoreResult<()> {
        let code = divider_code(self.dram_freq, speed_hz)?;
        debug!(
            "rtl838x: SPI clock {} Hz (divider code {})",
            speed_hz, code
        );

        let sfcr = self.read_reg(REG_SFCR) & !SFCR_CLK_DIV;
        self.write_reg(REG_SFCR, sfcr | (code << SFCR_CLK_DIV_OFF));
        self.speed_hz = speed_hz;

        Ok(())
    }

    /// Raise both chip selects, with a full low pulse in between
    ///
    /// The pulse terminates whatever command a device was left in the
    /// middle of, so the next select starts from a clean state.
    fn deselect(&mut self) -> CoreResult<()> {
        self.write_reg(REG_SFCSR, SFCSR_CSB0 | SFCSR_CSB1);
        self.wait_ready()?;
        self.write_reg(REG_SFCSR, 0);
        self.wait_ready()?;
        self.write_reg(REG_SFCSR, SFCSR_CSB0 | SFCSR_CSB1);
        self.wait_ready()
    }

    /// Assert the chip select for `slot`
    fn select(&mut self, slot: Slot) -> CoreResult<()> {
        self.deselect()?;

        // CSB bits are active low; CHIP_SEL routes the data path to
        // slot 1
        let sfcsr = match slot {
            Slot::Cs0 => SFCSR_CSB1,
            Slot::Cs1 => SFCSR_CSB0 | SFCSR_CHIP_SEL,
        };
        self.write_reg(REG_SFCSR, sfcsr);
        self.wait_ready()
    }

    /// Shift `buf` in from the device
    fn read(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        // One snapshot keeps the chip-select lines as select() left them
        let base = self.read_reg(REG_SFCSR) & !SFCSR_LEN;

        self.wait_ready()?;
        self.write_reg(REG_SFCSR, base | (len_codes::SPI_LEN4 << SFCSR_LEN_OFF));

        let mut chunks = buf.chunks_exact_mut(4);
        for chunk in &mut chunks {
            self.wait_ready()?;
            let word = self.read_reg(REG_SFDR);
            chunk.copy_from_slice(&word.to_be_bytes());
        }

        self.wait_ready()?;
        self.write_reg(REG_SFCSR, base | (len_codes::SPI_LEN1 << SFCSR_LEN_OFF));

        for byte in chunks.into_remainder() {
            self.wait_ready()?;
            // Only the top byte lane carries device data in byte mode
            *byte = (self.read_reg(REG_SFDR) >> 24) as u8;
        }

        Ok(())
    }

    /// Shift `buf` out to the device
    fn write(&mut self, buf: &[u8]) -> CoreResult<()> {
        let base = self.read_reg(REG_SFCSR) & !SFCSR_LEN;

        self.wait_ready()?;
        self.write_reg(REG_SFCSR, base | (len_codes::SPI_LEN4 << SFCSR_LEN_OFF));

        let mut chunks = buf.chunks_exact(4);
        for chunk in &mut chunks {
            self.wait_ready()?;
            let mut word = [0u8; 4];
            word.copy_from_slice(chunk);
            self.write_reg(REG_SFDR, u32::from_be_bytes(word));
        }

        self.wait_ready()?;
        self.write_reg(REG_SFCSR, base | (len_codes::SPI_LEN1 << SFCSR_LEN_OFF));

        for &byte in chunks.remainder() {
            self.wait_ready()?;
            self.write_reg(REG_SFDR, u32::from(byte) << 24);
        }

        Ok(())
    }

    /// Log the control and status registers with their fields decoded
    ///
    /// The data registers are left alone, since reading them clocks the
    /// bus.
    pub fn dump_registers(&mut self) {
        let sfcr = self.read_reg(REG_SFCR);
        info!("rtl838x: SFCR:  {:#010x}", sfcr);
        let code = (sfcr & SFCR_CLK_DIV) >> SFCR_CLK_DIV_OFF;
        info!(
            "rtl838x:   ClkDiv: {} (reference clock / {})",
            code,
            2 * (code + 1)
        );

        let sfcr2 = self.read_reg(REG_SFCR2);
        info!("rtl838x: SFCR2: {:#010x}", sfcr2);
        info!(
            "rtl838x:   SfCmd: {:#04x}",
            (sfcr2 & SFCR2_SFCMD) >> SFCR2_SFCMD_OFF
        );
        info!(
            "rtl838x:   SfSize: {}",
            (sfcr2 & SFCR2_SFSIZE) >> SFCR2_SFSIZE_OFF
        );
        info!("rtl838x:   RdOpt: {}", (sfcr2 >> 20) & 1);
        info!("rtl838x:   HoldTillSfdr2: {}", (sfcr2 >> 10) & 1);

        let sfcsr = self.read_reg(REG_SFCSR);
        info!("rtl838x: SFCSR: {:#010x}", sfcsr);
        info!(
            "rtl838x:   Csb0: {}, Csb1: {}",
            (sfcsr >> 31) & 1,
            (sfcsr >> 30) & 1
        );
        info!(
            "rtl838x:   Len: {} byte(s)",
            ((sfcsr & SFCSR_LEN) >> SFCSR_LEN_OFF) + 1
        );
        info!("rtl838x:   Rdy: {}", (sfcsr >> 27) & 1);
        let width = (sfcsr & SFCSR_IO_WIDTH) >> SFCSR_IO_WIDTH_OFF;
        info!("rtl838x:   IoWidth: {} ({})", width, io_width_name(width));
        info!("rtl838x:   ChipSel: {}", (sfcsr >> 24) & 1);
    }

    fn run_message(
        &mut self,
        message: &mut Message<'_, '_>,
        actual_length: &mut usize,
    ) -> CoreResult<()> {
        debug!(
            "rtl838x: message for {:?}: {} transfer(s), {} byte(s)",
            message.slot,
            message.transfers.len(),
            message.total_bytes()
        );

        self.wait_ready()?;

        // The slowest device in the message sets the clock
        let mut speed = if message.speed_hz != 0 {
            message.speed_hz
        } else {
            self.speed_hz
        };
        for transfer in message.transfers.iter() {
            if transfer.speed_hz != 0 && transfer.speed_hz < speed {
                speed = transfer.speed_hz;
            }
        }

        self.prepare(speed)?;
        self.select(message.slot)?;

        for transfer in message.transfers.iter_mut() {
            if transfer.is_conflicting() {
                return Err(CoreError::ConflictingTransfer);
            }
            if let Some(tx) = transfer.tx {
                self.write(tx)?;
            } else if let Some(rx) = transfer.rx.as_deref_mut() {
                self.read(rx)?;
            }
            *actual_length += transfer.len();
        }

        self.deselect()
    }
}

impl<B: RegisterBus> SpiController for Rtl838xSpi<B> {
    fn setup(&mut self, max_speed_hz: u32) -> CoreResult<u32> {
        let ceiling = self.dram_freq / 2;
        let floor = self.dram_freq / 16;

        let speed = if max_speed_hz == 0 || max_speed_hz > ceiling {
            ceiling
        } else {
            max_speed_hz
        };
        if speed < floor {
            error!("rtl838x: requested speed is too low: {} Hz", max_speed_hz);
            return Err(CoreError::InvalidSpeed {
                requested_hz: max_speed_hz,
            });
        }

        debug!(
            "rtl838x: setup: {} Hz requested, using {} Hz",
            max_speed_hz, speed
        );
        self.speed_hz = speed;
        Ok(speed)
    }

    fn max_transfer_size(&self) -> usize {
        MAX_TRANSFER_SIZE
    }

    fn transfer_message(&mut self, mut message: Message<'_, '_>) -> Completion {
        let mut actual_length = 0;
        match self.run_message(&mut message, &mut actual_length) {
            Ok(()) => Completion::ok(actual_length),
            Err(err) => {
                debug!(
                    "rtl838x: message failed after {} byte(s): {}",
                    actual_length, err
                );
                Completion::failed(err, actual_length)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimBus;
    use rtlspi_core::Transfer;

    fn sim_spi() -> Rtl838xSpi<SimBus> {
        Rtl838xSpi::with_bus(SimBus::new(), DRAM_FREQ)
    }

    #[test]
    fn test_divider_code() {
        let cases = [
            (100_000_000, 0),
            (200_000_000, 0),
            (66_666_667, 0),
            (50_000_000, 1),
            (40_000_000, 1),
            (25_000_000, 3),
            (13_000_000, 7),
            (12_500_000, 7),
        ];
        for (speed, code) in cases {
            assert_eq!(divider_code(DRAM_FREQ, speed), Ok(code), "speed {}", speed);
        }
    }

    #[test]
    fn test_divider_code_out_of_range() {
        for speed in [12_499_999, 1_000_000, 0] {
            assert_eq!(
                divider_code(DRAM_FREQ, speed),
                Err(CoreError::InvalidSpeed {
                    requested_hz: speed
                })
            );
        }
    }

    #[test]
    fn test_setup_clamps_and_rejects() {
        let mut spi = sim_spi();
        assert_eq!(spi.setup(0), Ok(100_000_000));
        assert_eq!(spi.setup(250_000_000), Ok(100_000_000));
        assert_eq!(spi.setup(30_000_000), Ok(30_000_000));
        assert_eq!(spi.speed_hz(), 30_000_000);
        assert_eq!(spi.setup(12_500_000), Ok(12_500_000));
        assert_eq!(
            spi.setup(12_499_999),
            Err(CoreError::InvalidSpeed {
                requested_hz: 12_499_999
            })
        );
    }

    #[test]
    fn test_select_pulses_both_lines() {
        let mut spi = sim_spi();
        spi.select(Slot::Cs0).unwrap();
        assert_eq!(
            spi.bus().sfcsr_writes(),
            &[
                SFCSR_CSB0 | SFCSR_CSB1,
                0,
                SFCSR_CSB0 | SFCSR_CSB1,
                SFCSR_CSB1,
            ]
        );
    }

    #[test]
    fn test_select_second_slot() {
        let mut spi = sim_spi();
        spi.select(Slot::Cs1).unwrap();
        let writes = spi.bus().sfcsr_writes();
        assert_eq!(writes[writes.len() - 1], SFCSR_CSB0 | SFCSR_CHIP_SEL);
    }

    #[test]
    fn test_reselect_repeats_pulse() {
        let mut spi = sim_spi();
        spi.select(Slot::Cs0).unwrap();
        spi.select(Slot::Cs1).unwrap();
        spi.select(Slot::Cs0).unwrap();

        // Every select performs the full three-step pulse first
        let writes = spi.bus().sfcsr_writes();
        assert_eq!(writes.len(), 12);
        for select in writes.chunks_exact(4) {
            assert_eq!(
                &select[..3],
                &[SFCSR_CSB0 | SFCSR_CSB1, 0, SFCSR_CSB0 | SFCSR_CSB1]
            );
        }
    }

    #[test]
    fn test_deselect_raises_both_lines() {
        let mut spi = sim_spi();
        spi.deselect().unwrap();
        assert_eq!(
            spi.bus().sfcsr_writes(),
            &[SFCSR_CSB0 | SFCSR_CSB1, 0, SFCSR_CSB0 | SFCSR_CSB1]
        );
        assert_eq!(
            spi.bus().sfcsr() & (SFCSR_CSB0 | SFCSR_CSB1),
            SFCSR_CSB0 | SFCSR_CSB1
        );
    }

    #[test]
    fn test_prepare_preserves_other_sfcr_bits() {
        let mut spi = sim_spi();
        spi.bus_mut().write(REG_SFCR, 0x0000_1234);
        spi.prepare(25_000_000).unwrap();
        assert_eq!(spi.bus().sfcr(), 0x0000_1234 | (3 << SFCR_CLK_DIV_OFF));
    }

    #[test]
    fn test_read_batches_words_then_bytes() {
        let mut spi = sim_spi();
        spi.bus_mut()
            .queue_miso(&[0xDE, 0xAD, 0xBE, 0xEF, 0x5A, 0x01, 0x02]);
        spi.select(Slot::Cs0).unwrap();

        let mut buf = [0u8; 7];
        spi.read(&mut buf).unwrap();
        assert_eq!(buf, [0xDE, 0xAD, 0xBE, 0xEF, 0x5A, 0x01, 0x02]);
        assert_eq!(spi.bus().data_access_counts(), (1, 3));

        // Mode changes keep the selected chip asserted
        let writes = spi.bus().sfcsr_writes();
        assert_eq!(writes.len(), 6);
        assert_eq!(writes[4] & SFCSR_LEN, len_codes::SPI_LEN4 << SFCSR_LEN_OFF);
        assert_eq!(writes[5] & SFCSR_LEN, len_codes::SPI_LEN1 << SFCSR_LEN_OFF);
        for w in &writes[4..] {
            assert_eq!(w & SFCSR_CSB0, 0);
            assert_ne!(w & SFCSR_CSB1, 0);
        }
    }

    #[test]
    fn test_write_batches_words_then_bytes() {
        let mut spi = sim_spi();
        spi.select(Slot::Cs0).unwrap();
        spi.write(&[0x11, 0x22, 0x33, 0x44, 0x55]).unwrap();
        assert_eq!(spi.bus().mosi(), &[0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(spi.bus().data_access_counts(), (1, 1));
    }

    #[test]
    fn test_large_read_uses_word_accesses_only() {
        let mut spi = sim_spi();
        let pattern: alloc::vec::Vec<u8> = (0..=255).collect();
        spi.bus_mut().queue_miso(&pattern);
        spi.select(Slot::Cs0).unwrap();

        let mut buf = [0u8; 256];
        spi.read(&mut buf).unwrap();
        assert_eq!(buf[..], pattern[..]);
        assert_eq!(spi.bus().data_access_counts(), (64, 0));
    }

    #[test]
    fn test_short_read_masks_floating_lanes() {
        let mut spi = sim_spi();
        spi.bus_mut().queue_miso(&[0x01, 0x02, 0x03]);
        spi.select(Slot::Cs0).unwrap();

        let mut buf = [0u8; 3];
        spi.read(&mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_single_byte_rides_the_top_lane() {
        let mut spi = sim_spi();
        spi.bus_mut().queue_miso(&[0xAB]);
        spi.select(Slot::Cs0).unwrap();

        spi.write(&[0xAB]).unwrap();
        assert_eq!(spi.bus().mosi(), &[0xAB]);

        let mut buf = [0u8; 1];
        spi.read(&mut buf).unwrap();
        assert_eq!(buf, [0xAB]);
    }

    #[test]
    fn test_message_roundtrip() {
        let mut spi = sim_spi();
        spi.bus_mut().queue_miso(&[0xC2, 0x20, 0x18]);

        let cmd = [0x9F];
        let mut id = [0u8; 3];
        let mut transfers = [Transfer::write(&cmd), Transfer::read(&mut id)];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));

        assert!(completion.is_ok());
        assert_eq!(completion.actual_length, 4);
        assert_eq!(id, [0xC2, 0x20, 0x18]);
        assert_eq!(spi.bus().mosi(), &[0x9F]);
        // Chip select released once the message is done
        assert_eq!(
            spi.bus().sfcsr() & (SFCSR_CSB0 | SFCSR_CSB1),
            SFCSR_CSB0 | SFCSR_CSB1
        );
    }

    #[test]
    fn test_message_picks_slowest_speed() {
        let mut spi = sim_spi();
        let a = [0u8; 2];
        let b = [0u8; 2];
        let c = [0u8; 2];
        let mut transfers = [
            Transfer::write(&a).with_speed(40_000_000),
            Transfer::write(&b),
            Transfer::write(&c).with_speed(50_000_000),
        ];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 100_000_000));

        assert!(completion.is_ok());
        assert_eq!((spi.bus().sfcr() & SFCR_CLK_DIV) >> SFCR_CLK_DIV_OFF, 1);
        assert_eq!(spi.speed_hz(), 40_000_000);
    }

    #[test]
    fn test_message_with_too_low_speed_fails() {
        let mut spi = sim_spi();
        let data = [0u8; 2];
        let mut transfers = [Transfer::write(&data).with_speed(1_000_000)];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));

        assert_eq!(
            completion.status,
            Err(CoreError::InvalidSpeed {
                requested_hz: 1_000_000
            })
        );
        assert_eq!(completion.actual_length, 0);
        // Failed before touching the chip-select lines
        assert!(spi.bus().sfcsr_writes().is_empty());
    }

    #[test]
    fn test_conflicting_transfer_aborts_message() {
        let mut spi = sim_spi();
        let first = [0xAA, 0xBB];
        let bad_tx = [0x00];
        let mut bad_rx = [0u8; 1];
        let mut tail = [0u8; 2];
        let mut transfers = [
            Transfer::write(&first),
            Transfer {
                tx: Some(&bad_tx),
                rx: Some(&mut bad_rx),
                speed_hz: 0,
            },
            Transfer::read(&mut tail),
        ];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));

        assert_eq!(completion.status, Err(CoreError::ConflictingTransfer));
        assert_eq!(completion.actual_length, 2);
        // Only the first transfer ever touched the data register
        assert_eq!(spi.bus().data_access_counts(), (0, 2));
        assert_eq!(spi.bus().mosi(), &[0xAA, 0xBB]);
        assert_eq!(tail, [0, 0]);
    }

    #[test]
    fn test_empty_transfer_moves_no_data() {
        let mut spi = sim_spi();
        let mut transfers = [Transfer::write(&[])];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));

        assert!(completion.is_ok());
        assert_eq!(completion.actual_length, 0);
        assert_eq!(spi.bus().data_access_counts(), (0, 0));
    }

    #[test]
    fn test_stuck_busy_times_out() {
        let mut spi = sim_spi();
        spi.bus_mut().set_stuck_busy(true);

        let data = [0u8; 4];
        let mut transfers = [Transfer::write(&data)];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));

        assert_eq!(completion.status, Err(CoreError::Timeout));
        assert_eq!(completion.actual_length, 0);
        // One extra status read for the diagnostic after the poll loop
        assert_eq!(spi.bus().status_reads(), WAIT_MAX_LOOP as usize + 1);
    }

    #[test]
    fn test_delayed_ready_is_tolerated() {
        let mut spi = sim_spi();
        spi.bus_mut().delay_ready(5);

        let data = [0x42];
        let mut transfers = [Transfer::write(&data)];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));

        assert!(completion.is_ok());
        assert_eq!(spi.bus().mosi(), &[0x42]);
    }

    #[test]
    fn test_dump_leaves_data_registers_alone() {
        let mut spi = sim_spi();
        spi.dump_registers();
        assert_eq!(spi.bus().data_access_counts(), (0, 0));
    }

    /// Simulator wrapper that wedges the ready bit after a fixed number
    /// of data-register accesses, like hardware dying mid-message
    struct WedgingBus {
        sim: SimBus,
        budget: usize,
    }

    impl WedgingBus {
        fn new(budget: usize) -> Self {
            Self {
                sim: SimBus::new(),
                budget,
            }
        }

        fn spend(&mut self) {
            self.budget = self.budget.saturating_sub(1);
            if self.budget == 0 {
                self.sim.set_stuck_busy(true);
            }
        }
    }

    impl RegisterBus for WedgingBus {
        fn read(&mut self, reg: usize) -> u32 {
            let val = self.sim.read(reg);
            if reg == REG_SFDR {
                self.spend();
            }
            val
        }

        fn write(&mut self, reg: usize, val: u32) {
            self.sim.write(reg, val);
            if reg == REG_SFDR {
                self.spend();
            }
        }

        fn delay_us(&mut self, us: u32) {
            self.sim.delay_us(us);
        }
    }

    #[test]
    fn test_timeout_mid_transfer_counts_no_bytes() {
        let mut spi = Rtl838xSpi::with_bus(WedgingBus::new(1), DRAM_FREQ);
        let data = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
        let mut transfers = [Transfer::write(&data)];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));

        assert_eq!(completion.status, Err(CoreError::Timeout));
        // The first word was already on the wire, but the transfer never
        // finished, so it contributes nothing
        assert_eq!(completion.actual_length, 0);
        assert_eq!(spi.bus().sim.mosi(), &[0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_timeout_counts_only_finished_transfers() {
        let mut spi = Rtl838xSpi::with_bus(WedgingBus::new(2), DRAM_FREQ);
        let first = [0xA1, 0xA2, 0xA3, 0xA4];
        let second = [0xB1, 0xB2, 0xB3, 0xB4];
        let mut transfers = [Transfer::write(&first), Transfer::write(&second)];
        let completion =
            spi.transfer_message(Message::new(Slot::Cs0, &mut transfers, 25_000_000));

        assert_eq!(completion.status, Err(CoreError::Timeout));
        // All eight bytes were clocked, but only the first transfer ran
        // to completion
        assert_eq!(spi.bus().sim.mosi().len(), 8);
        assert_eq!(completion.actual_length, 4);
    }
}
