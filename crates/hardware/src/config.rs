//! Configuration for the ZPU harness.
//!
//! This module defines the platform layout the sequencer builds. It provides:
//! 1. **Defaults:** The built-in platform (32 KiB text at 0, 2 KiB stack below 128 KiB,
//!    UART aliases).
//! 2. **Structures:** General, memory and UART sections.
//! 3. **Validation:** Layout checks run before any buffer is allocated.
//!
//! The CLI uses `Config::default()`; embedders can deserialize a JSON document instead.

use serde::Deserialize;
use thiserror::Error;

use crate::common::SegmentError;
use crate::sim::srec::MAX_LINE_CAPACITY;

/// Default configuration constants.
mod defaults {
    /// Base of the code segment.
    pub const TEXT_BASE: u32 = 0x0000_0000;

    /// Size of the code segment (32 KiB).
    pub const TEXT_SIZE: u32 = 32 * 1024;

    /// Base of the stack segment.
    pub const STACK_BASE: u32 = 0x0001_F800;

    /// Size of the stack segment (2 KiB), ending at 0x20000.
    pub const STACK_SIZE: u32 = 2 * 1024;

    /// Value handed to `Core::reset` before loading.
    pub const RESET_PC: u32 = 0x0001_FFF8;

    /// Longest S-record line accepted, in characters.
    ///
    /// `S` + type + 255 hex-encoded bytes, plus one spare.
    pub const LINE_BUFFER_CAPACITY: usize = super::MAX_LINE_CAPACITY;

    /// Aliases of the UART status/data register.
    pub const UART_ADDRESSES: [u32; 2] = [0x8000_0024, 0x080A_000C];

    /// Status word returned by 32-bit UART loads.
    pub const UART_READY: u32 = 0x100;
}

/// Configuration could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document did not parse.
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    /// The memory layout is malformed.
    #[error(transparent)]
    Layout(#[from] SegmentError),

    /// The S-record line buffer is empty or larger than any record needs.
    #[error("line buffer capacity {capacity} outside 1..={max}", max = MAX_LINE_CAPACITY)]
    LineBuffer {
        /// Requested capacity.
        capacity: usize,
    },
}

/// Root configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Reset and loader settings.
    pub general: GeneralConfig,
    /// Segment layout.
    pub memory: MemoryConfig,
    /// UART register stub.
    pub uart: UartConfig,
}

/// Reset and loader settings.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Value handed to `Core::reset`.
    pub reset_pc: u32,
    /// Longest S-record line accepted.
    pub line_buffer_capacity: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            reset_pc: defaults::RESET_PC,
            line_buffer_capacity: defaults::LINE_BUFFER_CAPACITY,
        }
    }
}

/// Segment layout.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Base of the code segment.
    pub text_base: u32,
    /// Size of the code segment in bytes.
    pub text_size: u32,
    /// Base of the stack segment.
    pub stack_base: u32,
    /// Size of the stack segment in bytes.
    pub stack_size: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            text_base: defaults::TEXT_BASE,
            text_size: defaults::TEXT_SIZE,
            stack_base: defaults::STACK_BASE,
            stack_size: defaults::STACK_SIZE,
        }
    }
}

impl MemoryConfig {
    /// First address past the stack segment, saturated at the top of the address space.
    pub const fn stack_top(&self) -> u32 {
        self.stack_base.saturating_add(self.stack_size)
    }
}

/// UART register stub.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UartConfig {
    /// Addresses the register answers at.
    pub addresses: Vec<u32>,
    /// Status word returned by 32-bit loads.
    pub ready_status: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            addresses: defaults::UART_ADDRESSES.to_vec(),
            ready_status: defaults::UART_READY,
        }
    }
}

impl Config {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the segment layout and line buffer before anything is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacity = self.general.line_buffer_capacity;
        if !(1..=MAX_LINE_CAPACITY).contains(&capacity) {
            return Err(ConfigError::LineBuffer { capacity });
        }
        let m = &self.memory;
        check_range("text", m.text_base, m.text_size)?;
        check_range("stack", m.stack_base, m.stack_size)?;
        Ok(())
    }
}

fn check_range(name: &str, base: u32, size: u32) -> Result<(), SegmentError> {
    if size == 0 {
        return Err(SegmentError::ZeroSize { name: name.into() });
    }
    if base.checked_add(size - 1).is_none() {
        return Err(SegmentError::RangeOverflow {
            name: name.into(),
            base,
            size,
        });
    }
    Ok(())
}
