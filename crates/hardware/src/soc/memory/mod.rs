//! Segmented, permission-checked system memory.
//!
//! This module implements the memory segment table. It provides:
//! 1. **Segments:** Fixed-base, fixed-size byte regions tagged with read/write/execute bits.
//! 2. **Chained lookup:** The most recently registered segment is consulted first; a miss
//!    falls through to the previous one, and exhausting the chain is a segmentation violation.
//! 3. **Protection:** Explicit unlock/lock of a segment's write permission around loading.
//! 4. **Opcode accounting:** Instruction fetches from a code-bearing segment are counted.

/// A single permissioned segment and its permission set.
pub mod segment;

use tracing::{debug, trace};

use self::segment::Segment;
use crate::common::{AccessType, SegmentError, Trap, Width};

pub use self::segment::Permissions;

/// Handle to a segment registered in a [`SegmentTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentId(usize);

impl SegmentId {
    /// Position of the segment in registration order.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// The chain of segments making up the address space.
#[derive(Debug, Default)]
pub struct SegmentTable {
    /// Registration order; lookup walks this back to front.
    segments: Vec<Segment>,
    opcode_fetches: u64,
}

impl SegmentTable {
    /// Creates an empty table. Every access faults until a segment is registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `segment` as the new head of the chain.
    ///
    /// Later registrations shadow earlier ones where their ranges overlap.
    pub fn register(&mut self, segment: Segment) -> SegmentId {
        debug!(
            name = segment.name(),
            base = format_args!("{:#010x}", segment.base()),
            size = segment.size(),
            perms = %segment.permissions(),
            "segment registered"
        );
        self.segments.push(segment);
        SegmentId(self.segments.len() - 1)
    }

    /// Returns the segment behind `id`.
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.0)
    }

    /// Iterates segments in lookup order (head of the chain first).
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().rev()
    }

    /// Number of registered segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if no segment has been registered.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Instruction fetches served from (or faulted against) a code-bearing segment.
    pub const fn opcode_fetches(&self) -> u64 {
        self.opcode_fetches
    }

    /// Walks the chain from its head and returns the first segment containing `addr`.
    fn resolve(&self, addr: u32) -> Option<usize> {
        self.segments.iter().rposition(|s| s.contains(addr))
    }

    /// Changes the write protection of a segment.
    ///
    /// `locked == false` adds write permission (used while loading the code segment);
    /// `locked == true` removes it and restores the designated read/execute bits.
    pub fn set_protection(&mut self, id: SegmentId, locked: bool) -> Result<(), SegmentError> {
        let segment = self
            .segments
            .get_mut(id.0)
            .ok_or(SegmentError::UnknownSegment(id.0))?;
        segment.set_protection(locked);
        debug!(
            name = segment.name(),
            locked,
            perms = %segment.permissions(),
            "segment protection changed"
        );
        Ok(())
    }

    fn load(&self, addr: u32, width: Width, access: AccessType) -> Result<u32, Trap> {
        let idx = self.resolve(addr).ok_or(Trap::segv(addr, access))?;
        let segment = &self.segments[idx];
        if !segment.permissions().allows(access) {
            return Err(Trap::segv(addr, access));
        }
        segment.load(addr, width).ok_or(Trap::segv(addr, access))
    }

    /// Reads a value of `width` at `addr`; the serving segment must be readable.
    pub fn read(&self, addr: u32, width: Width) -> Result<u32, Trap> {
        self.load(addr, width, AccessType::Read)
    }

    /// Writes the low `width` bytes of `value` at `addr`; the serving segment must be writable.
    pub fn write(&mut self, addr: u32, width: Width, value: u32) -> Result<(), Trap> {
        let fault = Trap::segv(addr, AccessType::Write);
        let idx = self.resolve(addr).ok_or_else(|| fault.clone())?;
        let segment = &mut self.segments[idx];
        if !segment.permissions().allows(AccessType::Write) || !segment.store(addr, width, value) {
            return Err(fault);
        }
        Ok(())
    }

    /// Fetches one opcode byte at `addr`; the serving segment must be executable.
    ///
    /// Every fetch that resolves to a code-bearing segment is counted, whether or not
    /// it is permitted.
    pub fn fetch(&mut self, addr: u32) -> Result<u8, Trap> {
        if let Some(idx) = self.resolve(addr) {
            if self.segments[idx].is_code_bearing() {
                self.opcode_fetches += 1;
                trace!(addr = format_args!("{addr:#010x}"), "opcode fetch");
            }
        }
        self.load(addr, Width::Byte, AccessType::Fetch)
            .map(|v| v as u8)
    }

    /// Reads a byte bypassing permissions. Returns `None` if no segment serves `addr`.
    ///
    /// Used for inspection (tests, dumps), never by the running program.
    pub fn peek(&self, addr: u32) -> Option<u8> {
        let idx = self.resolve(addr)?;
        self.segments[idx].load(addr, Width::Byte).map(|v| v as u8)
    }
}
