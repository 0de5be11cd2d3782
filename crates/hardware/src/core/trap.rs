//! Trap Dispatch.
//!
//! Every fault raised by the core or the segment table ends up here. The dispatcher:
//! 1. **Reports:** Writes a headline and the register dump to the diagnostic stream.
//! 2. **Decides:** Returns [`Disposition::Halt`] for every genuine fault and
//!    [`Disposition::Continue`] for the informational configuration query.
//!
//! The dispatcher never exits the process; the sequencer does that once, at the top.

use std::fmt;
use std::io::Write;

use tracing::{error, warn};

use super::{Core, CoreState};
use crate::common::Trap;

/// What the sequencer should do after a trap was reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Resume execution.
    Continue,
    /// Stop; no further instructions may run.
    Halt,
}

/// Reports traps to the diagnostic stream.
pub struct TrapHandler {
    diag: Box<dyn Write + Send>,
    traps_taken: u64,
}

impl TrapHandler {
    /// Creates a dispatcher writing reports to `diag`.
    pub fn new(diag: Box<dyn Write + Send>) -> Self {
        Self {
            diag,
            traps_taken: 0,
        }
    }

    /// Number of traps dispatched so far, informational ones included.
    pub const fn traps_taken(&self) -> u64 {
        self.traps_taken
    }

    /// Diagnostic stream the reports go to.
    pub fn diag(&mut self) -> &mut dyn Write {
        &mut *self.diag
    }

    /// Reports `trap` raised while `core` was running and decides whether to go on.
    pub fn dispatch<C: Core + ?Sized>(&mut self, trap: &Trap, core: &C) -> Disposition {
        self.traps_taken += 1;
        let state = core.state();
        match trap {
            Trap::ConfigQuery => {
                self.emit(format_args!("CONFIG: cpu id {:08x}", core.cpu_id()));
                return Disposition::Continue;
            }
            Trap::Breakpoint => self.report(format_args!("BREAKPOINT"), &state),
            Trap::DivideByZero => self.report(format_args!("DIVIDE BY ZERO"), &state),
            Trap::IllegalOpcode(op) => {
                self.report(format_args!("ILLEGAL OPCODE {op:02x}"), &state);
            }
            Trap::SegmentationViolation { addr, access } => self.report(
                format_args!("SEGMENTATION VIOLATION: {access} at {addr:08x}"),
                &state,
            ),
        }
        error!(%trap, pc = format_args!("{:#010x}", state.pc), "fatal trap");
        Disposition::Halt
    }

    /// Writes one register dump line.
    pub fn dump(&mut self, state: &CoreState) {
        self.emit(format_args!("{state}"));
    }

    fn report(&mut self, headline: fmt::Arguments<'_>, state: &CoreState) {
        self.emit(headline);
        self.dump(state);
    }

    fn emit(&mut self, line: fmt::Arguments<'_>) {
        let result = writeln!(self.diag, "{line}").and_then(|()| self.diag.flush());
        if let Err(e) = result {
            warn!(error = %e, "diagnostic stream write failed");
        }
    }
}

impl fmt::Debug for TrapHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapHandler")
            .field("traps_taken", &self.traps_taken)
            .finish_non_exhaustive()
    }
}
