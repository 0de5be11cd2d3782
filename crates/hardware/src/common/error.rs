//! Trap and configuration error definitions.
//!
//! This module defines the two error channels shared by every component:
//! 1. **Traps:** Faults raised by the CPU core or the segment table while a program runs.
//! 2. **Segment errors:** Malformed segment setup detected before anything is loaded.

use thiserror::Error;

use super::data::AccessType;

/// Faults delivered to the trap dispatcher.
///
/// All variants except [`Trap::ConfigQuery`] are fatal: once raised, no further
/// instructions are executed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Trap {
    /// Breakpoint instruction executed.
    #[error("Breakpoint")]
    Breakpoint,

    /// Integer division or modulo by zero.
    #[error("DivideByZero")]
    DivideByZero,

    /// The core fetched an opcode it cannot execute.
    ///
    /// The associated value is the offending opcode byte.
    #[error("IllegalOpcode({0:#04x})")]
    IllegalOpcode(u8),

    /// The program asked the core for its configuration identifier.
    ///
    /// Informational only; execution continues after it is reported.
    #[error("ConfigQuery")]
    ConfigQuery,

    /// Access to an address no segment serves, or without the needed permission.
    #[error("SegmentationViolation({addr:#010x}, {access})")]
    SegmentationViolation {
        /// Offending virtual address, preserved exactly as issued.
        addr: u32,
        /// Kind of access that faulted.
        access: AccessType,
    },
}

impl Trap {
    /// Returns `true` if this trap must stop execution.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::ConfigQuery)
    }

    /// Builds a segmentation violation for `addr`.
    pub const fn segv(addr: u32, access: AccessType) -> Self {
        Self::SegmentationViolation { addr, access }
    }
}

/// Malformed segment setup. Always fatal at startup.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// A segment was declared with zero bytes.
    #[error("segment '{name}': size must be non-zero")]
    ZeroSize {
        /// Diagnostic label of the segment.
        name: String,
    },

    /// The backing buffer cannot hold the declared size.
    #[error("segment '{name}': backing buffer holds {len} bytes, {size} required")]
    BufferTooSmall {
        /// Diagnostic label of the segment.
        name: String,
        /// Bytes available in the supplied buffer.
        len: usize,
        /// Declared segment size.
        size: u32,
    },

    /// `base + size` does not fit in the 32-bit address space.
    #[error("segment '{name}': range {base:#010x}+{size:#x} exceeds the 32-bit address space")]
    RangeOverflow {
        /// Diagnostic label of the segment.
        name: String,
        /// Declared base address.
        base: u32,
        /// Declared segment size.
        size: u32,
    },

    /// A segment handle that was never issued by this table.
    #[error("no segment registered with id {0}")]
    UnknownSegment(usize),
}
