//! S-record Load Driver.
//!
//! Populates memory from an S-record stream and resolves the program entry point. It performs:
//! 1. **Unlock:** Opens the target (code) segment for writing.
//! 2. **Stream:** Applies each record in file order; meta records are acknowledged, store
//!    records are written byte by byte, termination records move the core's PC.
//! 3. **Lock:** Closes the target segment again, on success and on the first failure alike.
//!
//! The first failure aborts the load and is returned as the overall result.

use std::io::BufRead;

use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::srec::{DecodeError, Record, RecordReader};
use crate::common::{AccessType, SegmentError, Trap, Width};
use crate::core::Core;
use crate::soc::memory::{SegmentId, SegmentTable};

/// The load could not complete. Nothing may be executed afterwards.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The tokenizer rejected a line, or the stream could not be read.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A store record hit an address no writable segment serves.
    #[error("store record byte at {addr:#010x} rejected: {trap}")]
    Store {
        /// Address of the failing byte.
        addr: u32,
        /// Fault raised by the segment table.
        trap: Trap,
    },

    /// The target segment handle is not valid.
    #[error(transparent)]
    Segment(#[from] SegmentError),
}

/// What a successful load did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Meta records acknowledged.
    pub meta_records: u64,
    /// Store records applied.
    pub store_records: u64,
    /// Termination records applied.
    pub term_records: u64,
    /// Payload bytes written.
    pub bytes_loaded: u64,
    /// Entry point from the last termination record, if any.
    pub entry: Option<u32>,
    /// Text of the `S0` header record, if present.
    pub header: Option<String>,
}

/// Applies records to memory and to the core.
#[derive(Debug)]
pub struct Loader<'a, C: ?Sized> {
    memory: &'a mut SegmentTable,
    core: &'a mut C,
    summary: LoadSummary,
}

impl<'a, C: Core + ?Sized> Loader<'a, C> {
    /// Creates a loader writing into `memory` and moving `core`'s PC.
    pub fn new(memory: &'a mut SegmentTable, core: &'a mut C) -> Self {
        Self {
            memory,
            core,
            summary: LoadSummary::default(),
        }
    }

    /// Applies one record.
    pub fn apply(&mut self, record: &Record) -> Result<(), LoadError> {
        match record {
            Record::Meta {
                kind,
                address,
                data,
            } => {
                let text = String::from_utf8_lossy(data);
                debug!(kind, address, text = %text, "meta record");
                if *kind == 0 && self.summary.header.is_none() {
                    self.summary.header = Some(text.into_owned());
                }
                self.summary.meta_records += 1;
            }
            Record::Store { address, data } => {
                trace!(
                    address = format_args!("{address:#010x}"),
                    len = data.len(),
                    "store record"
                );
                for (i, &byte) in data.iter().enumerate() {
                    // A payload running past 0xffffffff has no address to land on.
                    let Some(addr) = address.checked_add(i as u32) else {
                        let addr = address.wrapping_add(i as u32);
                        return Err(LoadError::Store {
                            addr,
                            trap: Trap::segv(addr, AccessType::Write),
                        });
                    };
                    self.memory
                        .write(addr, Width::Byte, u32::from(byte))
                        .map_err(|trap| LoadError::Store { addr, trap })?;
                }
                self.summary.store_records += 1;
                self.summary.bytes_loaded += data.len() as u64;
            }
            Record::Terminate { entry, data } => {
                if !data.is_empty() {
                    debug!(trailing = ?data, "termination record payload ignored");
                }
                self.core.set_pc(*entry);
                self.summary.entry = Some(*entry);
                self.summary.term_records += 1;
            }
        }
        Ok(())
    }

    /// Consumes the loader, returning what it did.
    pub fn finish(self) -> LoadSummary {
        self.summary
    }
}

/// Streams every record from `records` into memory, with `target` unlocked for the duration.
pub fn load_records<C, I>(
    memory: &mut SegmentTable,
    target: SegmentId,
    core: &mut C,
    records: I,
) -> Result<LoadSummary, LoadError>
where
    C: Core + ?Sized,
    I: IntoIterator<Item = Result<Record, DecodeError>>,
{
    memory.set_protection(target, false)?;
    let result = stream(memory, core, records);
    memory.set_protection(target, true)?;

    let summary = result?;
    match summary.entry {
        Some(entry) => info!(
            entry = format_args!("{entry:#010x}"),
            records = summary.store_records,
            bytes = summary.bytes_loaded,
            "image loaded"
        ),
        None => warn!("image has no termination record; PC left at its reset value"),
    }
    Ok(summary)
}

/// Reads an S-record text stream and loads it; see [`load_records`].
pub fn load_srec<C, R>(
    memory: &mut SegmentTable,
    target: SegmentId,
    core: &mut C,
    reader: R,
    line_capacity: usize,
) -> Result<LoadSummary, LoadError>
where
    C: Core + ?Sized,
    R: BufRead,
{
    load_records(memory, target, core, RecordReader::new(reader, line_capacity))
}

fn stream<C, I>(
    memory: &mut SegmentTable,
    core: &mut C,
    records: I,
) -> Result<LoadSummary, LoadError>
where
    C: Core + ?Sized,
    I: IntoIterator<Item = Result<Record, DecodeError>>,
{
    let mut loader = Loader::new(memory, core);
    for record in records {
        loader.apply(&record?)?;
    }
    Ok(loader.finish())
}
