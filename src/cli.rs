//! CLI argument parsing

use clap::{Parser, Subcommand};

/// Parse a clock value that may be written in hex or decimal
fn parse_u32(s: &str) -> Result<u32, String> {
    let lower = s.to_ascii_lowercase();
    match lower.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16)
            .map_err(|_| format!("`{}` is not a valid hex value", s)),
        None => lower
            .parse()
            .map_err(|_| format!("`{}` is not a number", s)),
    }
}

#[derive(Parser)]
#[command(name = "rtlspi")]
#[command(author, version, about = "RTL838x SPI flash controller tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Controller options as comma-separated key=value pairs
    /// (e.g. "base=0xb8001200,dramfreq=200000000")
    #[arg(long, global = true)]
    pub controller: Option<String>,

    /// Run against the register simulator instead of real hardware
    #[arg(long, global = true)]
    pub sim: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dump the controller registers with their fields decoded
    Regs,

    /// Read the JEDEC ID of the attached flash chip
    Id {
        /// Chip-select slot (0 or 1)
        #[arg(long, default_value = "0")]
        cs: u8,

        /// SPI clock in Hz (hex or decimal)
        #[arg(long, value_parser = parse_u32, default_value = "25000000")]
        speed: u32,
    },

    /// Show how a requested SPI clock maps onto the clock divider
    Speed {
        /// Requested SPI clock in Hz (hex or decimal)
        #[arg(value_parser = parse_u32)]
        hz: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u32_forms() {
        assert_eq!(parse_u32("25000000"), Ok(25_000_000));
        assert_eq!(parse_u32("0x17d7840"), Ok(25_000_000));
        assert_eq!(parse_u32("0X17D7840"), Ok(25_000_000));
        assert!(parse_u32("25 MHz").is_err());
        assert!(parse_u32("0x").is_err());
    }
}
