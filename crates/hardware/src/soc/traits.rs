//! Override hook trait for memory-mapped I/O.
//!
//! This module defines the `MmioOverride` trait implemented by every device that intercepts
//! loads and stores. It provides:
//! 1. **Identification:** `name` for diagnostics.
//! 2. **Predicate:** `claims` decides whether the hook wants to see an address at all.
//! 3. **Access:** Width-aware `get` and `set`, each of which may handle or decline.
//!
//! Hooks are consulted in registration order before the segment table. A hook that declines
//! lets the access fall through to plain memory.

use crate::common::Width;
use crate::soc::memory::SegmentTable;

/// A memory-mapped device that can intercept loads and stores.
pub trait MmioOverride: Send {
    /// Short name for diagnostics (e.g. `"UART"`).
    fn name(&self) -> &str;

    /// Returns `true` if `addr` belongs to this device.
    fn claims(&self, addr: u32) -> bool;

    /// Handles a load of `width` at `addr`, or returns `None` to decline.
    ///
    /// `memory` is the segment table the access would otherwise reach.
    fn get(&mut self, memory: &SegmentTable, addr: u32, width: Width) -> Option<u32>;

    /// Handles a store of `value` at `addr`. Returns `false` to decline.
    fn set(&mut self, memory: &SegmentTable, addr: u32, width: Width, value: u32) -> bool;
}
