//! A single permissioned memory segment.
//!
//! A segment is a fixed base and size over an owned, zero-filled byte buffer, tagged
//! with a permission set. Multi-byte values are stored big-endian, matching the ZPU.

use std::fmt;
use std::ops::BitOr;

use crate::common::{AccessType, SegmentError, Width};

/// Subset of {readable, writable, executable}.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Permissions(u8);

impl Permissions {
    /// No access at all.
    pub const NONE: Self = Self(0);
    /// Readable.
    pub const READ: Self = Self(0b001);
    /// Writable.
    pub const WRITE: Self = Self(0b010);
    /// Executable.
    pub const EXEC: Self = Self(0b100);
    /// Code segment designation: read + execute.
    pub const RX: Self = Self(0b101);
    /// Data and stack designation: read + write.
    pub const RW: Self = Self(0b011);
    /// Everything.
    pub const RWX: Self = Self(0b111);

    /// Returns `true` if every permission in `other` is present.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `self` with `other` added.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `self` with `other` removed.
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Returns `true` if an access of the given kind is permitted.
    pub const fn allows(self, access: AccessType) -> bool {
        match access {
            AccessType::Fetch => self.contains(Self::EXEC),
            AccessType::Read => self.contains(Self::READ),
            AccessType::Write => self.contains(Self::WRITE),
        }
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.with(rhs)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |p: Self, c: char| if self.contains(p) { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(Self::READ, 'r'),
            flag(Self::WRITE, 'w'),
            flag(Self::EXEC, 'x')
        )
    }
}

/// One contiguous, permissioned region of the emulated address space.
#[derive(Clone)]
pub struct Segment {
    name: String,
    base: u32,
    size: u32,
    /// Permissions the segment was created with; `set_protection(true)` restores these.
    designated: Permissions,
    perms: Permissions,
    buffer: Vec<u8>,
}

impl Segment {
    /// Creates a segment over `buffer`, mapped at `[base, base + size)`.
    ///
    /// The buffer is truncated to `size` bytes. Fails if `size` is zero, the buffer is
    /// shorter than `size`, or the range runs past the end of the 32-bit space.
    pub fn new(
        name: impl Into<String>,
        mut buffer: Vec<u8>,
        base: u32,
        size: u32,
        perms: Permissions,
    ) -> Result<Self, SegmentError> {
        let name = name.into();
        if size == 0 {
            return Err(SegmentError::ZeroSize { name });
        }
        if buffer.len() < size as usize {
            return Err(SegmentError::BufferTooSmall {
                name,
                len: buffer.len(),
                size,
            });
        }
        if base.checked_add(size - 1).is_none() {
            return Err(SegmentError::RangeOverflow { name, base, size });
        }
        buffer.truncate(size as usize);
        Ok(Self {
            name,
            base,
            size,
            designated: perms,
            perms,
            buffer,
        })
    }

    /// Diagnostic label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First address served by this segment.
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Size in bytes.
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Current permission set.
    pub const fn permissions(&self) -> Permissions {
        self.perms
    }

    /// Permission set the segment was created with.
    pub const fn designated(&self) -> Permissions {
        self.designated
    }

    /// Code-bearing segments are the ones designated executable; fetches from them are counted.
    pub const fn is_code_bearing(&self) -> bool {
        self.designated.contains(Permissions::EXEC)
    }

    /// Returns `true` if `addr` lies in `[base, base + size)`.
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// Raw contents of the segment.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Opens (`locked == false`) or closes (`locked == true`) the segment for writing.
    ///
    /// Locking drops write access and restores the designated read/execute bits. Stored
    /// bytes are never touched.
    pub fn set_protection(&mut self, locked: bool) {
        self.perms = if locked {
            self.designated.without(Permissions::WRITE)
        } else {
            self.designated.with(Permissions::WRITE)
        };
    }

    /// Byte offset of an access of `width` at `addr`, if it fits entirely in this segment.
    fn span(&self, addr: u32, width: Width) -> Option<usize> {
        if !self.contains(addr) {
            return None;
        }
        let offset = addr - self.base;
        (self.size - offset >= width.bytes()).then_some(offset as usize)
    }

    /// Reads a big-endian value of `width` at `addr`, ignoring permissions.
    pub fn load(&self, addr: u32, width: Width) -> Option<u32> {
        let offset = self.span(addr, width)?;
        let bytes = &self.buffer[offset..offset + width.bytes() as usize];
        Some(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    /// Writes the low `width` bytes of `value` big-endian at `addr`, ignoring permissions.
    ///
    /// Returns `false` if the access does not fit in the segment.
    pub fn store(&mut self, addr: u32, width: Width, value: u32) -> bool {
        let Some(offset) = self.span(addr, width) else {
            return false;
        };
        let len = width.bytes() as usize;
        let be = value.to_be_bytes();
        self.buffer[offset..offset + len].copy_from_slice(&be[4 - len..]);
        true
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("base", &format_args!("{:#010x}", self.base))
            .field("size", &format_args!("{:#x}", self.size))
            .field("perms", &format_args!("{}", self.perms))
            .finish_non_exhaustive()
    }
}
