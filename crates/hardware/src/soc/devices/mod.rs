//! Memory-mapped I/O devices.
//!
//! Devices are installed as override hooks in front of the segment table.

/// Minimal UART: fixed ready status, character output on word stores.
pub mod uart;

pub use uart::Uart;

pub use crate::soc::traits::MmioOverride;
