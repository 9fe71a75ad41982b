//! rtlspi - RTL838x SPI flash controller tool
//!
//! Diagnostic front end for the SPI flash controller (SPIF) found on
//! Realtek RTL838x switch SoCs.
//!
//! # Architecture
//!
//! The driver in `rtlspi-rtl838x` is generic over a register bus, so
//! every command can run either against the real memory-mapped register
//! window (requires root and `/dev/mem`) or against the built-in
//! register simulator (`--sim`), which is handy for checking command
//! plumbing on a development machine.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use rtlspi_rtl838x::Rtl838xConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let config = match load_config(cli.controller.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid controller options: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Regs => commands::regs::run(&config, cli.sim),
        Commands::Id { cs, speed } => commands::id::run(&config, cli.sim, cs, speed),
        Commands::Speed { hz } => commands::speed::run(&config, hz),
    };

    result
}

/// Build the controller config from the --controller option string
///
/// The option string is a comma-separated list of key=value pairs, e.g.
/// "base=0xb8001200,dramfreq=200000000". Missing keys keep their
/// defaults.
fn load_config(options: Option<&str>) -> Result<Rtl838xConfig, String> {
    let Some(options) = options else {
        return Ok(Rtl838xConfig::default());
    };

    let mut pairs = Vec::new();
    for item in options.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let Some((key, value)) = item.split_once('=') else {
            return Err(format!("Expected key=value, got: {}", item));
        };
        pairs.push((key, value));
    }

    rtlspi_rtl838x::parse_options(&pairs)
}
