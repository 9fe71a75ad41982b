//! CLI command implementations
//!
//! Each command comes in two layers: a `run` entry point that attaches
//! to either the real register window or the simulator, and a generic
//! body that works with any register bus. The generic body is where the
//! actual work happens, so `--sim` exercises the same code paths as
//! real hardware.

pub mod id;
pub mod regs;
pub mod speed;
