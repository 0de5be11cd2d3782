//! Machine: the explicit emulator context and its execution sequence.
//!
//! Owns the bus (segments + override hooks), the core, the trap dispatcher and the run
//! statistics. The sequence is fixed, and each step is a precondition for the next:
//! 1. zero-filled backing buffers;
//! 2. segment chain: text (read + execute), then stack (read + write);
//! 3. bus bound to the chain, UART hook installed;
//! 4. core reset;
//! 5. text unlocked, image loaded, text locked;
//! 6. the run loop, until a fatal trap or a halt.

use std::fmt;
use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::{info, warn};

use super::loader::{self, LoadError, LoadSummary};
use crate::common::{SegmentError, Trap};
use crate::config::{Config, ConfigError};
use crate::core::{Core, Disposition, Step, TrapHandler};
use crate::soc::devices::Uart;
use crate::soc::memory::segment::Segment;
use crate::soc::{Bus, Permissions, SegmentId, SegmentTable};
use crate::stats::SimStats;

/// Setup or load failure. Nothing is executed after one of these.
#[derive(Debug, Error)]
pub enum RunError {
    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A segment could not be constructed.
    #[error(transparent)]
    Segment(#[from] SegmentError),

    /// The image could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The program executed a normal halt.
    Halted,
    /// A fatal trap stopped execution.
    Trapped(Trap),
}

impl Outcome {
    /// Process exit status for this outcome.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Halted => 0,
            Self::Trapped(_) => 1,
        }
    }
}

/// Per-step trace budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceBudget {
    /// No tracing.
    Off,
    /// Trace every step.
    Unbounded,
    /// Trace this many more steps.
    Remaining(u64),
}

impl TraceBudget {
    /// Maps the `-t [clks]` convention: absent → off, `0` → unbounded, `n` → `n` steps.
    pub const fn from_clocks(clocks: Option<u64>) -> Self {
        match clocks {
            None => Self::Off,
            Some(0) => Self::Unbounded,
            Some(n) => Self::Remaining(n),
        }
    }

    /// Consumes one unit of budget; returns `true` if this step should be traced.
    pub const fn take(&mut self) -> bool {
        match *self {
            Self::Off | Self::Remaining(0) => false,
            Self::Unbounded => true,
            Self::Remaining(n) => {
                *self = Self::Remaining(n - 1);
                true
            }
        }
    }
}

/// The emulator context.
pub struct Machine<C> {
    /// Override hooks in front of the segment chain.
    pub bus: Bus,
    /// The CPU core.
    pub core: C,
    /// Run statistics.
    pub stats: SimStats,
    traps: TrapHandler,
    text: SegmentId,
    stack: SegmentId,
    line_capacity: usize,
}

impl<C: Core> Machine<C> {
    /// Builds the address space and resets `core`.
    ///
    /// Device output (UART) goes to `uart_out`; trap reports, register dumps and trace
    /// lines go to `diag`.
    pub fn new(
        config: &Config,
        mut core: C,
        uart_out: Box<dyn Write + Send>,
        diag: Box<dyn Write + Send>,
    ) -> Result<Self, RunError> {
        config.validate()?;
        let m = &config.memory;

        let text_buf = vec![0u8; m.text_size as usize];
        let stack_buf = vec![0u8; m.stack_size as usize];

        let mut memory = SegmentTable::new();
        let text = memory.register(Segment::new(
            "text",
            text_buf,
            m.text_base,
            m.text_size,
            Permissions::RX,
        )?);
        let stack = memory.register(Segment::new(
            "stack",
            stack_buf,
            m.stack_base,
            m.stack_size,
            Permissions::RW,
        )?);

        let mut bus = Bus::new(memory);
        bus.add_override(Box::new(Uart::new(
            &config.uart.addresses,
            config.uart.ready_status,
            uart_out,
        )));

        core.reset(config.general.reset_pc);

        Ok(Self {
            bus,
            core,
            stats: SimStats::default(),
            traps: TrapHandler::new(diag),
            text,
            stack,
            line_capacity: config.general.line_buffer_capacity,
        })
    }

    /// Handle of the code segment.
    pub const fn text_segment(&self) -> SegmentId {
        self.text
    }

    /// Handle of the stack segment.
    pub const fn stack_segment(&self) -> SegmentId {
        self.stack
    }

    /// Loads an S-record stream into the code segment and sets the entry point.
    pub fn load<R: BufRead>(&mut self, reader: R) -> Result<LoadSummary, LoadError> {
        let summary = loader::load_srec(
            &mut self.bus.memory,
            self.text,
            &mut self.core,
            reader,
            self.line_capacity,
        )?;
        self.stats.meta_records += summary.meta_records;
        self.stats.store_records += summary.store_records;
        self.stats.term_records += summary.term_records;
        self.stats.bytes_loaded += summary.bytes_loaded;
        Ok(summary)
    }

    /// Runs the core until a fatal trap or a halt.
    ///
    /// `trace` follows the `-t [clks]` convention (see [`TraceBudget::from_clocks`]).
    pub fn run(&mut self, trace: Option<u64>) -> Outcome {
        let mut budget = TraceBudget::from_clocks(trace);
        info!(
            pc = format_args!("{:#010x}", self.core.pc()),
            "execution started"
        );
        let outcome = loop {
            match self.core.step(&mut self.bus) {
                Ok(Step::Continue) => {}
                Ok(Step::Halt) => {
                    self.stats.steps += 1;
                    break Outcome::Halted;
                }
                Err(trap) => match self.traps.dispatch(&trap, &self.core) {
                    Disposition::Continue => {}
                    Disposition::Halt => break Outcome::Trapped(trap),
                },
            }
            self.stats.steps += 1;
            if budget.take() {
                self.stats.traced_steps += 1;
                self.traps.dump(&self.core.state());
            }
        };
        self.stats.traps_taken = self.traps.traps_taken();
        self.stats.opcode_fetches = self.bus.memory.opcode_fetches();
        info!(?outcome, steps = self.stats.steps, "execution finished");
        outcome
    }

    /// Writes the current register state to the diagnostic stream.
    pub fn dump_state(&mut self) {
        let state = self.core.state();
        self.traps.dump(&state);
    }

    /// Writes the run statistics to the diagnostic stream.
    pub fn print_stats(&mut self) {
        self.stats.opcode_fetches = self.bus.memory.opcode_fetches();
        self.stats.traps_taken = self.traps.traps_taken();
        if let Err(e) = self.stats.print(self.traps.diag()) {
            warn!(error = %e, "could not write statistics");
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("bus", &self.bus)
            .field("core", &self.core)
            .field("text", &self.text)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}
