//! Program loading and execution sequencing.
//!
//! Provides the S-record tokenizer, the load driver that feeds it into memory, and the
//! machine that sequences setup, loading and execution.

pub mod loader;
pub mod simulator;
pub mod srec;
