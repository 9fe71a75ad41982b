//! Clock divider inspection command

use rtlspi_core::SpiController;
use rtlspi_rtl838x::{divider_code, Rtl838xConfig, Rtl838xSpi, SimBus};

/// Show how a requested SPI clock maps onto the divider
///
/// This is pure arithmetic, so it always runs on the simulator and never
/// touches hardware.
pub fn run(config: &Rtl838xConfig, hz: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut spi = Rtl838xSpi::with_bus(SimBus::new(), config.dram_freq);

    let negotiated = spi.setup(hz)?;
    let code = divider_code(config.dram_freq, negotiated)?;
    let divisor = 2 * (code + 1);

    println!("Reference clock: {} Hz", config.dram_freq);
    println!("Requested:       {} Hz", hz);
    println!("Negotiated:      {} Hz", negotiated);
    println!("Divider code:    {} (divide by {})", code, divisor);
    println!("Effective clock: {} Hz", config.dram_freq / divisor);
    Ok(())
}
