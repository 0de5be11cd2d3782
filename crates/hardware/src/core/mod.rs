//! CPU core interface.
//!
//! The harness does not implement an instruction set. It drives any core through the
//! [`Core`] trait:
//! 1. **Lifecycle:** `reset` to the platform's initial PC, then repeated `step`s.
//! 2. **Registers:** PC access for the loader, and a [`CoreState`] snapshot for dumps.
//! 3. **Faults:** A step returns a [`Trap`] instead of touching process state.

/// Built-in core that fetches opcodes without executing them.
pub mod fetch;

/// Trap dispatcher: fault reports and the continue/halt decision.
pub mod trap;

use std::fmt;

use crate::common::Trap;
use crate::soc::Bus;

pub use fetch::FetchCore;
pub use trap::{Disposition, TrapHandler};

/// Result of a successful step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Keep going.
    Continue,
    /// The program executed a normal halt.
    Halt,
}

/// Register snapshot handed to trap handlers and tracers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreState {
    /// Program counter.
    pub pc: u32,
    /// Stack pointer.
    pub sp: u32,
    /// Value on top of the stack.
    pub tos: u32,
    /// Currently decoded instruction byte.
    pub opcode: u8,
    /// Decode state bits.
    pub decode_mask: u8,
    /// Core-specific debug word.
    pub debug: u32,
}

impl fmt::Display for CoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC={:08x} SP={:08x} TOS={:08x} OP={:02x} DM={:02x} debug={:08x}",
            self.pc, self.sp, self.tos, self.opcode, self.decode_mask, self.debug
        )
    }
}

/// A CPU core the harness can load and run.
pub trait Core {
    /// Resets the core; execution would start at `initial_pc`.
    fn reset(&mut self, initial_pc: u32);

    /// Executes one instruction, issuing all memory traffic through `bus`.
    fn step(&mut self, bus: &mut Bus) -> Result<Step, Trap>;

    /// Current program counter.
    fn pc(&self) -> u32;

    /// Moves the program counter, e.g. to the entry point of a loaded image.
    fn set_pc(&mut self, pc: u32);

    /// Snapshot of the registers.
    fn state(&self) -> CoreState;

    /// Configuration identifier reported on a configuration query.
    fn cpu_id(&self) -> u32;

    /// Current stack pointer.
    fn sp(&self) -> u32 {
        self.state().sp
    }

    /// Current top-of-stack value.
    fn tos(&self) -> u32 {
        self.state().tos
    }
}
