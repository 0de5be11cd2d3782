//! Run statistics collection and reporting.
//!
//! This module tracks what the harness did during one run. It provides:
//! 1. **Loading:** Meta, store and termination records seen, and bytes written.
//! 2. **Execution:** Steps executed, steps traced, traps dispatched.
//! 3. **Fetches:** Opcode fetches observed on the code-bearing segment.

use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Run statistics.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    /// Header, count and other records with no memory effect.
    pub meta_records: u64,
    /// Data records applied to memory.
    pub store_records: u64,
    /// Termination records (entry point updates).
    pub term_records: u64,
    /// Payload bytes written by store records.
    pub bytes_loaded: u64,
    /// Instructions the core completed.
    pub steps: u64,
    /// Steps that produced a trace line.
    pub traced_steps: u64,
    /// Traps dispatched, informational ones included.
    pub traps_taken: u64,
    /// Opcode fetches from the code-bearing segment.
    pub opcode_fetches: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            meta_records: 0,
            store_records: 0,
            term_records: 0,
            bytes_loaded: 0,
            steps: 0,
            traced_steps: 0,
            traps_taken: 0,
            opcode_fetches: 0,
        }
    }
}

impl SimStats {
    /// Wall-clock time since the statistics were created.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Writes a short summary to `out`.
    pub fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "\n==========================================================")?;
        writeln!(out, "RUN STATISTICS")?;
        writeln!(out, "==========================================================")?;
        writeln!(
            out,
            "records: meta={} store={} term={}  bytes loaded={}",
            self.meta_records, self.store_records, self.term_records, self.bytes_loaded
        )?;
        writeln!(
            out,
            "steps={} traced={} traps={} opcode fetches={}",
            self.steps, self.traced_steps, self.traps_taken, self.opcode_fetches
        )?;
        writeln!(out, "elapsed: {:.3}s", self.elapsed().as_secs_f64())?;
        out.flush()
    }
}
