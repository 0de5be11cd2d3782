//! Memory Access Types.
//!
//! This module defines the classification of memory accesses used throughout the harness.
//! These types are used for the following:
//! 1. **Permission Validation:** Checking read/write/execute permissions on a segment.
//! 2. **Fault Generation:** Recording which kind of access raised a segmentation violation.
//! 3. **Opcode Accounting:** Telling instruction fetches apart from data loads.

use std::fmt;

/// Type of memory access operation.
///
/// Used to distinguish between instruction fetches, data loads, and data stores
/// for permission enforcement and fault reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessType {
    /// Instruction fetch access.
    ///
    /// Requires execute permission and is counted as an opcode fetch when it
    /// lands in a code-bearing segment.
    Fetch,

    /// Data read access.
    ///
    /// Requires read permission.
    Read,

    /// Data write access.
    ///
    /// Requires write permission.
    Write,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Width of a single memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Half,
    /// 32-bit access.
    Word,
}

impl Width {
    /// Number of bytes touched by an access of this width.
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }

    /// Mask selecting the bits a value of this width can hold.
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
            Self::Word => 0xFFFF_FFFF,
        }
    }
}
