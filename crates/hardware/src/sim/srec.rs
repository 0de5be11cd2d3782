//! Motorola S-record (S19/S28/S37) tokenizer.
//!
//! Reads a text stream line by line and classifies each line as one [`Record`]:
//! * `S0`, `S5`, `S6` → [`Record::Meta`] (header and record counts, no memory effect);
//! * `S1`, `S2`, `S3` → [`Record::Store`] (payload bytes at a 16/24/32-bit address);
//! * `S7`, `S8`, `S9` → [`Record::Terminate`] (entry address).
//!
//! Line layout: `S`, type digit, byte count, address, data, checksum, all hex. The byte
//! count covers address, data and checksum; the checksum is the ones' complement of the
//! low byte of the sum of every byte before it.

use std::io::{self, BufRead};

use thiserror::Error;

/// Longest line any record can need: `S`, type, count and 255 encoded bytes, plus one spare.
pub const MAX_LINE_CAPACITY: usize = 515;

/// One decoded S-record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    /// Header or count record.
    Meta {
        /// Record type digit (0, 5 or 6).
        kind: u8,
        /// Address field (record count for S5/S6, usually 0 for S0).
        address: u32,
        /// Payload bytes.
        data: Vec<u8>,
    },
    /// Data record to be written to memory.
    Store {
        /// Address of the first payload byte.
        address: u32,
        /// Payload bytes, in file order.
        data: Vec<u8>,
    },
    /// End of stream; carries the program entry address.
    Terminate {
        /// Entry point.
        entry: u32,
        /// Trailing payload, reported but never executed.
        data: Vec<u8>,
    },
}

impl Record {
    /// Address field of the record.
    pub const fn address(&self) -> u32 {
        match self {
            Self::Meta { address, .. } | Self::Store { address, .. } => *address,
            Self::Terminate { entry, .. } => *entry,
        }
    }

    /// Payload bytes.
    pub fn data(&self) -> &[u8] {
        match self {
            Self::Meta { data, .. } | Self::Store { data, .. } | Self::Terminate { data, .. } => {
                data
            }
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> u16 {
        // A byte count field caps the payload at 252 bytes.
        self.data().len() as u16
    }

    /// Returns `true` if the record carries no payload.
    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }
}

/// A line could not be turned into a record.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Reading the underlying stream failed.
    #[error("line {line}: read failed: {source}")]
    Io {
        /// 1-based line number.
        line: usize,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The line does not start with `S`.
    #[error("line {line}: record does not start with 'S'")]
    MissingStart {
        /// 1-based line number.
        line: usize,
    },

    /// The type digit is missing, reserved (`S4`) or not a digit.
    #[error("line {line}: unsupported record type {kind:?}")]
    UnknownType {
        /// 1-based line number.
        line: usize,
        /// The character found after `S`.
        kind: Option<char>,
    },

    /// A character outside `[0-9A-Fa-f]`, or an odd number of hex digits.
    #[error("line {line}: malformed hex at column {column}")]
    BadHex {
        /// 1-based line number.
        line: usize,
        /// 1-based column of the offending character.
        column: usize,
    },

    /// The byte count disagrees with the line, or is too small for the address.
    #[error("line {line}: byte count {declared} does not match {actual} bytes on the line")]
    CountMismatch {
        /// 1-based line number.
        line: usize,
        /// Count declared by the record.
        declared: usize,
        /// Bytes actually present after the count.
        actual: usize,
    },

    /// Checksum mismatch.
    #[error("line {line}: checksum {found:#04x}, expected {expected:#04x}")]
    Checksum {
        /// 1-based line number.
        line: usize,
        /// Checksum computed from the line.
        expected: u8,
        /// Checksum present on the line.
        found: u8,
    },

    /// The line exceeds the line buffer.
    #[error("line {line}: {len} characters exceed the {capacity}-character line buffer")]
    LineTooLong {
        /// 1-based line number.
        line: usize,
        /// Characters on the line.
        len: usize,
        /// Line buffer capacity.
        capacity: usize,
    },
}

impl DecodeError {
    /// 1-based line number the error was found on.
    pub const fn line(&self) -> usize {
        match self {
            Self::Io { line, .. }
            | Self::MissingStart { line }
            | Self::UnknownType { line, .. }
            | Self::BadHex { line, .. }
            | Self::CountMismatch { line, .. }
            | Self::Checksum { line, .. }
            | Self::LineTooLong { line, .. } => *line,
        }
    }
}

/// Streams records out of a line-oriented S-record source.
#[derive(Debug)]
pub struct RecordReader<R> {
    reader: R,
    buf: String,
    capacity: usize,
    line: usize,
    done: bool,
}

impl<R: BufRead> RecordReader<R> {
    /// Creates a reader accepting lines of at most `capacity` characters.
    pub fn new(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buf: String::with_capacity(capacity.min(MAX_LINE_CAPACITY) + 2),
            capacity,
            line: 0,
            done: false,
        }
    }

    /// Number of lines consumed so far.
    pub const fn line(&self) -> usize {
        self.line
    }

    fn next_record(&mut self) -> Option<Result<Record, DecodeError>> {
        loop {
            self.buf.clear();
            self.line += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(DecodeError::Io {
                        line: self.line,
                        source,
                    }));
                }
            }
            let text = self.buf.trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() {
                continue;
            }
            if text.len() > self.capacity {
                return Some(Err(DecodeError::LineTooLong {
                    line: self.line,
                    len: text.len(),
                    capacity: self.capacity,
                }));
            }
            return Some(decode_line(text, self.line));
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record, DecodeError>;

    /// Yields the next record. Stops after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.next_record();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

/// Address field width in bytes for each record type, `None` for reserved types.
const fn address_len(kind: u8) -> Option<usize> {
    match kind {
        0 | 1 | 5 | 9 => Some(2),
        2 | 6 | 8 => Some(3),
        3 | 7 => Some(4),
        _ => None,
    }
}

const fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decodes one line (without its terminator) into a record.
pub fn decode_line(text: &str, line: usize) -> Result<Record, DecodeError> {
    let bytes = text.trim_end().as_bytes();
    if bytes.first() != Some(&b'S') {
        return Err(DecodeError::MissingStart { line });
    }
    let kind_char = bytes.get(1).copied();
    let unknown = || DecodeError::UnknownType {
        line,
        kind: kind_char.map(char::from),
    };
    let kind = kind_char
        .filter(u8::is_ascii_digit)
        .map(|c| c - b'0')
        .ok_or_else(unknown)?;
    let addr_len = address_len(kind).ok_or_else(unknown)?;

    let hex = &bytes[2..];
    if hex.len() % 2 != 0 {
        return Err(DecodeError::BadHex {
            line,
            column: bytes.len() + 1,
        });
    }
    let mut raw = Vec::with_capacity(hex.len() / 2);
    for (i, pair) in hex.chunks_exact(2).enumerate() {
        let hi = nibble(pair[0]).ok_or(DecodeError::BadHex {
            line,
            column: 2 * i + 3,
        })?;
        let lo = nibble(pair[1]).ok_or(DecodeError::BadHex {
            line,
            column: 2 * i + 4,
        })?;
        raw.push((hi << 4) | lo);
    }

    let Some((&count, rest)) = raw.split_first() else {
        return Err(DecodeError::CountMismatch {
            line,
            declared: 0,
            actual: 0,
        });
    };
    let declared = count as usize;
    if declared != rest.len() || declared < addr_len + 1 {
        return Err(DecodeError::CountMismatch {
            line,
            declared,
            actual: rest.len(),
        });
    }

    let (body, checksum) = raw.split_at(raw.len() - 1);
    let sum = body.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    let expected = !sum;
    if checksum[0] != expected {
        return Err(DecodeError::Checksum {
            line,
            expected,
            found: checksum[0],
        });
    }

    let address = rest[..addr_len]
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    let data = rest[addr_len..rest.len() - 1].to_vec();

    Ok(match kind {
        1..=3 => Record::Store { address, data },
        7..=9 => Record::Terminate {
            entry: address,
            data,
        },
        _ => Record::Meta {
            kind,
            address,
            data,
        },
    })
}
