//! Common types shared by every component of the harness.
//!
//! This module provides:
//! 1. **Memory Access:** Access kinds (fetch/read/write) and widths (8/16/32-bit).
//! 2. **Error Handling:** The trap channel and segment configuration errors.

/// Memory access type definitions.
pub mod data;

/// Error types and trap definitions.
pub mod error;

pub use data::{AccessType, Width};
pub use error::{SegmentError, Trap};
