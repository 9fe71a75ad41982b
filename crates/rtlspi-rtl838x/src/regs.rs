//! Realtek RTL838x SPI flash controller (SPIF) register definitions
//!
//! Register offsets and bit definitions for the SPIF block in the RTL838x
//! switch SoC family. The block is five 32-bit registers at a fixed
//! physical address; the whole protocol is driven through the
//! configuration, control/status and data registers below.

// ============================================================================
// Register window
// ============================================================================

/// Physical base address of the SPIF register window
pub const SPIF_BASE: u64 = 0xB800_1200;

/// Number of bytes covered by the register window
pub const SPIF_WINDOW_SIZE: usize = 0x14;

/// SPI Flash Configuration register (32 bits)
pub const REG_SFCR: usize = 0x00;
/// SPI Flash Configuration register 2 (32 bits)
pub const REG_SFCR2: usize = 0x04;
/// SPI Flash Control & Status register (32 bits)
pub const REG_SFCSR: usize = 0x08;
/// SPI Flash Data register (32 bits)
pub const REG_SFDR: usize = 0x0C;
/// SPI Flash Data register 2 (32 bits, unused by this driver)
pub const REG_SFDR2: usize = 0x10;

// ============================================================================
// SFCR bits
// ============================================================================

/// Clock divider code field offset
pub const SFCR_CLK_DIV_OFF: u32 = 29;
/// Clock divider code field mask
pub const SFCR_CLK_DIV: u32 = 0x7 << SFCR_CLK_DIV_OFF;

// ============================================================================
// SFCR2 bits
// ============================================================================
// Programmed by the boot environment for the memory-mapped read path;
// this driver only decodes them for diagnostics.

/// Memory-mapped read command opcode field offset
pub const SFCR2_SFCMD_OFF: u32 = 24;
/// Memory-mapped read command opcode field mask
pub const SFCR2_SFCMD: u32 = 0xFF << SFCR2_SFCMD_OFF;
/// Flash size code field offset
pub const SFCR2_SFSIZE_OFF: u32 = 21;
/// Flash size code field mask
pub const SFCR2_SFSIZE: u32 = 0x7 << SFCR2_SFSIZE_OFF;
/// Read option bit
pub const SFCR2_RDOPT: u32 = 1 << 20;
/// Hold the transfer until data register 2 is accessed
pub const SFCR2_HOLD_TILL_SFDR2: u32 = 1 << 10;

// ============================================================================
// SFCSR bits
// ============================================================================

/// Chip-select 0 bar (line deasserted while set)
pub const SFCSR_CSB0: u32 = 1 << 31;
/// Chip-select 1 bar (line deasserted while set)
pub const SFCSR_CSB1: u32 = 1 << 30;
/// Data length-mode field offset
pub const SFCSR_LEN_OFF: u32 = 28;
/// Data length-mode field mask
pub const SFCSR_LEN: u32 = 0x3 << SFCSR_LEN_OFF;
/// Controller ready flag
pub const SFCSR_RDY: u32 = 1 << 27;
/// I/O width field offset
pub const SFCSR_IO_WIDTH_OFF: u32 = 25;
/// I/O width field mask
pub const SFCSR_IO_WIDTH: u32 = 0x3 << SFCSR_IO_WIDTH_OFF;
/// Data-path select for the second chip-select slot
pub const SFCSR_CHIP_SEL: u32 = 1 << 24;

/// Length-mode codes; each data-register access moves `code + 1` bytes
pub mod len_codes {
    /// One byte per data-register access
    pub const SPI_LEN1: u32 = 0;
    /// Two bytes per data-register access
    pub const SPI_LEN2: u32 = 1;
    /// Three bytes per data-register access
    pub const SPI_LEN3: u32 = 2;
    /// Four bytes per data-register access
    pub const SPI_LEN4: u32 = 3;
}

/// I/O width codes as decoded from [`SFCSR_IO_WIDTH`]
pub mod io_width {
    /// Single I/O
    pub const SPI_WIDTH1: u32 = 1;
    /// Dual I/O
    pub const SPI_WIDTH2: u32 = 2;
    /// Quad I/O
    pub const SPI_WIDTH4: u32 = 3;
}

// ============================================================================
// Fixed controller parameters
// ============================================================================

/// Number of chip-select slots the controller drives
pub const CS_COUNT: usize = 2;

/// Largest byte count a single transfer may carry
pub const MAX_TRANSFER_SIZE: usize = 256;

/// Ready-flag poll budget, in roughly-microsecond iterations
pub const WAIT_MAX_LOOP: u32 = 2000;

/// Reference clock feeding the SPI divider (200 MHz DRAM clock)
pub const DRAM_FREQ: u32 = 200_000_000;
