//! ZPU soft-core emulator harness.
//!
//! This crate provides everything around a ZPU core except its instruction set:
//! 1. **Memory:** A chain of fixed-size, permission-checked, big-endian segments.
//! 2. **MMIO:** Override hooks consulted before memory, with a minimal UART register stub.
//! 3. **Traps:** A fault channel returned by the core and reported by a single dispatcher.
//! 4. **Loading:** A Motorola S-record tokenizer and the driver that writes it into memory.
//! 5. **Sequencing:** The machine that builds the address space, loads an image and runs it.

/// Common types (access kinds, widths, traps, segment errors).
pub mod common;
/// Platform layout configuration (defaults, JSON deserialization, validation).
pub mod config;
/// CPU core interface, the fetch-only core and the trap dispatcher.
pub mod core;
/// S-record tokenizer, load driver and machine sequencing.
pub mod sim;
/// Bus, override hooks, devices and segmented memory.
pub mod soc;
/// Load and run statistics.
pub mod stats;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Core contract and the built-in fetch-only core.
pub use crate::core::{Core, FetchCore};
/// Emulator context and run outcome.
pub use crate::sim::simulator::{Machine, Outcome};
/// Bus the core issues every access through.
pub use crate::soc::Bus;
/// Fault channel shared by the core and memory.
pub use crate::common::Trap;
