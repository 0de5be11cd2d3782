//! Minimal memory-mapped UART.
//!
//! One status/data register, visible at several aliased addresses. Only 32-bit accesses
//! are handled:
//! * a load returns the fixed ready status word, so the program never waits;
//! * a store emits the low byte of the written word on the output stream, unbuffered.
//!
//! Every other width declines and falls through to plain memory.

use std::fmt;
use std::io::Write;

use tracing::warn;

use crate::common::Width;
use crate::soc::memory::SegmentTable;
use crate::soc::traits::MmioOverride;

/// UART register stub.
pub struct Uart {
    addresses: Vec<u32>,
    ready_status: u32,
    out: Box<dyn Write + Send>,
    /// Characters emitted so far.
    tx_count: u64,
}

impl Uart {
    /// Creates a UART answering at every address in `addresses`.
    pub fn new(addresses: &[u32], ready_status: u32, out: Box<dyn Write + Send>) -> Self {
        Self {
            addresses: addresses.to_vec(),
            ready_status,
            out,
            tx_count: 0,
        }
    }

    /// Number of characters written to the output stream.
    pub const fn tx_count(&self) -> u64 {
        self.tx_count
    }

    fn transmit(&mut self, byte: u8) {
        let result = self
            .out
            .write_all(&[byte])
            .and_then(|()| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "UART output failed");
        }
        self.tx_count += 1;
    }
}

impl MmioOverride for Uart {
    fn name(&self) -> &str {
        "UART"
    }

    fn claims(&self, addr: u32) -> bool {
        self.addresses.contains(&addr)
    }

    fn get(&mut self, _memory: &SegmentTable, _addr: u32, width: Width) -> Option<u32> {
        (width == Width::Word).then_some(self.ready_status)
    }

    fn set(&mut self, _memory: &SegmentTable, _addr: u32, width: Width, value: u32) -> bool {
        if width != Width::Word {
            return false;
        }
        self.transmit((value & 0xFF) as u8);
        true
    }
}

impl fmt::Debug for Uart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uart")
            .field("addresses", &self.addresses)
            .field("ready_status", &self.ready_status)
            .field("tx_count", &self.tx_count)
            .finish_non_exhaustive()
    }
}
