//! Forward-only CSV record boundary scanner.
//!
//! Splits a byte stream into raw CSV records without decoding or re-quoting
//! them. A record ends at an unquoted line terminator, so newlines embedded in
//! quoted fields stay inside their record. Each record is handed out verbatim,
//! terminator included, which lets the shard writer reproduce the source bytes
//! exactly.

use std::io::{self, BufRead};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Field delimiter. Only comma-separated files are supported.
const DELIMITER: u8 = b',';

/// Quote character; doubled inside a quoted field to escape itself.
const QUOTE: u8 = b'"';

/// Largest single record the scanner buffers before giving up (64 MB).
pub const DEFAULT_MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Record terminator used by a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineTerminator {
    /// Unix-style `\n`.
    Lf,
    /// Windows-style `\r\n`.
    CrLf,
}

/// How the scanner decides which terminator ends a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminatorMode {
    /// Use whatever the first unquoted newline looks like.
    #[default]
    Auto,
    /// Always use the given terminator.
    Fixed(LineTerminator),
}

/// Location of a record produced by [`RecordScanner::read_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan {
    /// Byte offset of the first byte of the record in the source.
    pub offset: u64,
    /// Length of the record in bytes, terminator included.
    pub len: usize,
}

/// An owned raw record, as yielded by the scanner's `Iterator` impl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Quote State Machine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    /// At the start of a field.
    FieldStart,
    /// Inside a field that did not open with a quote.
    Unquoted,
    /// Inside a quoted field.
    Quoted,
    /// Just saw a quote inside a quoted field: either the closing quote or the
    /// first half of an escaped `""`.
    QuoteInQuoted,
}

#[derive(Debug)]
struct BoundaryMachine {
    state: QuoteState,
    prev: Option<u8>,
    detected: Option<LineTerminator>,
}

impl BoundaryMachine {
    fn new(mode: TerminatorMode) -> Self {
        let detected = match mode {
            TerminatorMode::Auto => None,
            TerminatorMode::Fixed(terminator) => Some(terminator),
        };
        Self {
            state: QuoteState::FieldStart,
            prev: None,
            detected,
        }
    }

    /// Feeds one byte. Returns true when the byte ends the current record.
    fn feed(&mut self, byte: u8) -> bool {
        let prev = self.prev.replace(byte);

        let next = match (self.state, byte) {
            (QuoteState::Quoted, QUOTE) => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, QUOTE) => QuoteState::Quoted,
            (QuoteState::FieldStart, QUOTE) => QuoteState::Quoted,
            (_, DELIMITER) => QuoteState::FieldStart,
            (_, b'\n') => {
                if self.is_terminator(prev) {
                    self.end_record();
                    return true;
                }
                QuoteState::Unquoted
            }
            _ => QuoteState::Unquoted,
        };
        self.state = next;
        false
    }

    fn is_terminator(&mut self, prev: Option<u8>) -> bool {
        let after_cr = prev == Some(b'\r');
        match self.detected {
            Some(LineTerminator::Lf) => true,
            Some(LineTerminator::CrLf) => after_cr,
            None => {
                self.detected = Some(if after_cr {
                    LineTerminator::CrLf
                } else {
                    LineTerminator::Lf
                });
                true
            }
        }
    }

    fn end_record(&mut self) {
        self.state = QuoteState::FieldStart;
        self.prev = None;
    }

    fn in_quotes(&self) -> bool {
        self.state == QuoteState::Quoted
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scanner
// ─────────────────────────────────────────────────────────────────────────────

/// Lazily yields raw CSV records from a buffered reader in a single forward pass.
pub struct RecordScanner<R> {
    reader: R,
    machine: BoundaryMachine,
    offset: u64,
    records_read: u64,
    max_record_bytes: usize,
    finished: bool,
}

impl<R: BufRead> RecordScanner<R> {
    /// Creates a scanner that sniffs the terminator from the data.
    pub fn new(reader: R) -> Self {
        Self::with_terminator(reader, TerminatorMode::Auto)
    }

    /// Creates a scanner with an explicit terminator mode.
    pub fn with_terminator(reader: R, mode: TerminatorMode) -> Self {
        Self {
            reader,
            machine: BoundaryMachine::new(mode),
            offset: 0,
            records_read: 0,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
            finished: false,
        }
    }

    /// Sets the size guard for a single record.
    pub fn with_max_record_bytes(mut self, max: usize) -> Self {
        self.max_record_bytes = max.max(1);
        self
    }

    /// Total bytes consumed from the source so far.
    pub fn bytes_read(&self) -> u64 {
        self.offset
    }

    /// Number of complete records yielded so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// The terminator in effect: the configured one, or the one sniffed from
    /// the first record. `None` until a terminator has been seen in `Auto` mode.
    pub fn line_terminator(&self) -> Option<LineTerminator> {
        self.machine.detected
    }

    /// Reads the next record into `buf`, replacing its contents.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// - `AppError::MalformedRecord` if the input ends inside a quoted field
    ///   or a record outgrows the size guard
    /// - `AppError::ReadFailed` if the underlying reader fails
    pub fn read_record(&mut self, buf: &mut Vec<u8>) -> Result<Option<RecordSpan>, AppError> {
        buf.clear();
        if self.finished {
            return Ok(None);
        }

        let start = self.offset;

        loop {
            let available = match self.reader.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.finished = true;
                    return Err(AppError::ReadFailed {
                        offset: self.offset,
                        message: e.to_string(),
                    });
                }
            };

            if available.is_empty() {
                self.finished = true;
                if buf.is_empty() {
                    return Ok(None);
                }
                if self.machine.in_quotes() {
                    return Err(AppError::MalformedRecord {
                        offset: start,
                        reason: "unterminated quoted field at end of file".into(),
                    });
                }
                self.records_read += 1;
                return Ok(Some(RecordSpan {
                    offset: start,
                    len: buf.len(),
                }));
            }

            let mut consumed = available.len();
            let mut complete = false;
            for (i, &byte) in available.iter().enumerate() {
                if self.machine.feed(byte) {
                    consumed = i + 1;
                    complete = true;
                    break;
                }
            }

            buf.extend_from_slice(&available[..consumed]);
            self.reader.consume(consumed);
            self.offset += consumed as u64;

            if complete {
                self.records_read += 1;
                return Ok(Some(RecordSpan {
                    offset: start,
                    len: buf.len(),
                }));
            }

            if buf.len() > self.max_record_bytes {
                self.finished = true;
                return Err(AppError::MalformedRecord {
                    offset: start,
                    reason: format!(
                        "record exceeds {} bytes, possibly an unbalanced quote",
                        self.max_record_bytes
                    ),
                });
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordScanner<R> {
    type Item = Result<RawRecord, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut bytes = Vec::new();
        match self.read_record(&mut bytes) {
            Ok(Some(span)) => Some(Ok(RawRecord {
                offset: span.offset,
                bytes,
            })),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
