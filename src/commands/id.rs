//! JEDEC ID probe command

use rtlspi_core::{Message, Slot, SpiController, Transfer};
use rtlspi_rtl838x::{RegisterBus, Rtl838xConfig, Rtl838xSpi, SimBus};

/// JEDEC Read Identification opcode
const RDID: u8 = 0x9F;

/// Read and print the JEDEC ID of the chip in the given slot
pub fn run(
    config: &Rtl838xConfig,
    sim: bool,
    cs: u8,
    speed: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let slot = Slot::from_index(cs).ok_or_else(|| format!("Invalid chip select: {}", cs))?;

    if sim {
        let mut spi = Rtl838xSpi::with_bus(SimBus::new(), config.dram_freq);
        // Script a plausible chip answer so the command has something
        // to decode
        spi.bus_mut().queue_miso(&[0xC2, 0x20, 0x18]);
        probe(&mut spi, slot, speed)
    } else {
        let mut spi = Rtl838xSpi::open(config)?;
        probe(&mut spi, slot, speed)
    }
}

fn probe<B: RegisterBus>(
    spi: &mut Rtl838xSpi<B>,
    slot: Slot,
    speed: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let speed = spi.setup(speed)?;
    log::debug!("Probing slot {} at {} Hz", slot.index(), speed);

    let cmd = [RDID];
    let mut id = [0u8; 3];
    let mut transfers = [Transfer::write(&cmd), Transfer::read(&mut id)];
    let completion = spi.transfer_message(Message::new(slot, &mut transfers, speed));
    completion.status?;

    println!("JEDEC ID: {:02X} {:02X} {:02X}", id[0], id[1], id[2]);
    Ok(())
}
