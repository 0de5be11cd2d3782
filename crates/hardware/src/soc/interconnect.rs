//! System interconnect (bus) for memory and MMIO access.
//!
//! This module implements the bus the CPU core issues every access through. It provides:
//! 1. **Override routing:** Loads and stores are offered to the registered hooks first,
//!    in registration order; the first hook that handles the access wins.
//! 2. **Memory fallthrough:** Declined accesses go to the segment table.
//! 3. **Fetch path:** Instruction fetches bypass the hooks and go straight to memory.

use std::fmt;

use super::memory::SegmentTable;
use super::traits::MmioOverride;
use crate::common::{Trap, Width};

/// Bus connecting the CPU core to override hooks and segmented memory.
pub struct Bus {
    /// The segment chain backing every access the hooks decline.
    pub memory: SegmentTable,
    overrides: Vec<Box<dyn MmioOverride>>,
}

impl Bus {
    /// Creates a bus over `memory` with no hooks installed.
    pub fn new(memory: SegmentTable) -> Self {
        Self {
            memory,
            overrides: Vec::new(),
        }
    }

    /// Appends a hook. Hooks are consulted in the order they were added.
    pub fn add_override(&mut self, hook: Box<dyn MmioOverride>) {
        self.overrides.push(hook);
    }

    /// Number of installed hooks.
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Loads a value of `width` at `addr`.
    pub fn read(&mut self, addr: u32, width: Width) -> Result<u32, Trap> {
        for hook in &mut self.overrides {
            if hook.claims(addr) {
                if let Some(value) = hook.get(&self.memory, addr, width) {
                    return Ok(value & width.mask());
                }
            }
        }
        self.memory.read(addr, width)
    }

    /// Stores the low `width` bytes of `value` at `addr`.
    pub fn write(&mut self, addr: u32, width: Width, value: u32) -> Result<(), Trap> {
        for hook in &mut self.overrides {
            if hook.claims(addr) && hook.set(&self.memory, addr, width, value) {
                return Ok(());
            }
        }
        self.memory.write(addr, width, value)
    }

    /// Fetches an opcode byte at `addr`.
    pub fn fetch(&mut self, addr: u32) -> Result<u8, Trap> {
        self.memory.fetch(addr)
    }

    /// Loads one byte.
    pub fn read_u8(&mut self, addr: u32) -> Result<u8, Trap> {
        self.read(addr, Width::Byte).map(|v| v as u8)
    }

    /// Loads a big-endian half-word.
    pub fn read_u16(&mut self, addr: u32) -> Result<u16, Trap> {
        self.read(addr, Width::Half).map(|v| v as u16)
    }

    /// Loads a big-endian word.
    pub fn read_u32(&mut self, addr: u32) -> Result<u32, Trap> {
        self.read(addr, Width::Word)
    }

    /// Stores one byte.
    pub fn write_u8(&mut self, addr: u32, val: u8) -> Result<(), Trap> {
        self.write(addr, Width::Byte, u32::from(val))
    }

    /// Stores a big-endian half-word.
    pub fn write_u16(&mut self, addr: u32, val: u16) -> Result<(), Trap> {
        self.write(addr, Width::Half, u32::from(val))
    }

    /// Stores a big-endian word.
    pub fn write_u32(&mut self, addr: u32, val: u32) -> Result<(), Trap> {
        self.write(addr, Width::Word, val)
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.overrides.iter().map(|h| h.name()).collect();
        f.debug_struct("Bus")
            .field("memory", &self.memory)
            .field("overrides", &names)
            .finish()
    }
}
