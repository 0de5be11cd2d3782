//! Address space: bus, override hooks, devices and segmented memory.
//!
//! This module provides:
//! 1. **Interconnect:** The bus that offers each access to the hooks before memory.
//! 2. **Traits:** The `MmioOverride` hook contract.
//! 3. **Devices:** The UART register stub.
//! 4. **Memory:** The segment table and its permissioned segments.

/// Memory-mapped I/O devices.
pub mod devices;

/// System bus: override routing and memory fallthrough.
pub mod interconnect;

/// Segmented, permission-checked memory.
pub mod memory;

/// Override hook trait.
pub mod traits;

pub use interconnect::Bus;
pub use memory::{Permissions, SegmentId, SegmentTable};
pub use traits::MmioOverride;
