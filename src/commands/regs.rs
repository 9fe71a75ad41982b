//! Register dump command

use rtlspi_rtl838x::{RegisterBus, Rtl838xConfig, Rtl838xSpi, SimBus};

/// Dump the controller registers with their fields decoded
pub fn run(config: &Rtl838xConfig, sim: bool) -> Result<(), Box<dyn std::error::Error>> {
    if sim {
        let mut spi = Rtl838xSpi::with_bus(SimBus::new(), config.dram_freq);
        dump(&mut spi)
    } else {
        let mut spi = Rtl838xSpi::open(config)?;
        dump(&mut spi)
    }
}

fn dump<B: RegisterBus>(spi: &mut Rtl838xSpi<B>) -> Result<(), Box<dyn std::error::Error>> {
    spi.dump_registers();
    Ok(())
}
