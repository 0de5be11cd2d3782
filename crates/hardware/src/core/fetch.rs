//! Fetch-only core.
//!
//! Implements the [`Core`] contract without an instruction set: every step fetches the
//! opcode at PC through the bus, so permissions, segmentation faults and opcode accounting
//! all behave as they would under a real core, and then traps. Opcode `0x00` is the ZPU
//! breakpoint; anything else is reported as illegal.
//!
//! Useful for validating an image and its entry point. Plug a real core in through the
//! trait to actually execute programs.

use super::{Core, CoreState, Step};
use crate::common::Trap;
use crate::soc::Bus;

/// Opcode the ZPU reserves for `BREAKPOINT`.
pub const OPCODE_BREAKPOINT: u8 = 0x00;

/// Identifier reported on configuration queries.
pub const FETCH_CORE_ID: u32 = 0x0000_0001;

/// Core that decodes nothing beyond the breakpoint opcode.
#[derive(Clone, Debug)]
pub struct FetchCore {
    pc: u32,
    sp: u32,
    tos: u32,
    opcode: u8,
    stack_top: u32,
}

impl FetchCore {
    /// Creates a core whose stack pointer resets to `stack_top`.
    pub const fn new(stack_top: u32) -> Self {
        Self {
            pc: 0,
            sp: stack_top,
            tos: 0,
            opcode: 0,
            stack_top,
        }
    }
}

impl Core for FetchCore {
    fn reset(&mut self, initial_pc: u32) {
        self.pc = initial_pc;
        self.sp = self.stack_top;
        self.tos = 0;
        self.opcode = 0;
    }

    fn step(&mut self, bus: &mut Bus) -> Result<Step, Trap> {
        self.opcode = bus.fetch(self.pc)?;
        match self.opcode {
            OPCODE_BREAKPOINT => Err(Trap::Breakpoint),
            op => Err(Trap::IllegalOpcode(op)),
        }
    }

    fn pc(&self) -> u32 {
        self.pc
    }

    fn set_pc(&mut self, pc: u32) {
        self.pc = pc;
    }

    fn state(&self) -> CoreState {
        CoreState {
            pc: self.pc,
            sp: self.sp,
            tos: self.tos,
            opcode: self.opcode,
            decode_mask: 0,
            debug: 0,
        }
    }

    fn cpu_id(&self) -> u32 {
        FETCH_CORE_ID
    }
}
