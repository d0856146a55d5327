//! Incremental binary STL decoder.
//!
//! ```text
//! UINT8[80]    header (free-form)
//! UINT32       triangle count
//! foreach triangle
//!     REAL32[3]  normal
//!     REAL32[9]  vertices
//!     UINT16     attribute byte count
//!     UINT8[n]   attribute bytes
//! end
//! ```
//!
//! All scalars are little-endian. Records are accumulated byte by byte, so the
//! input may be split anywhere.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

use crate::callbacks::Callbacks;
use crate::error::{ErrorCode, Status, StlError, StlResult};
use crate::parser::Parser;
use crate::triangle::{Triangle, BINARY_COUNT_SIZE, BINARY_HEADER_SIZE, BINARY_RECORD_SIZE};
use crate::validate::{self, Verdict};

/// Header prefix written by ASCII files.
const ASCII_HEADER_PREFIX: &[u8] = b"solid ";

/// Binary parser progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryState {
    Header,
    Count,
    Triangle,
    Attributes,
    Done,
    Error,
}

/// Binary STL parser.
#[derive(Debug)]
pub struct BinaryParser<'a> {
    state: BinaryState,
    callbacks: Callbacks<'a>,
    header: [u8; BINARY_HEADER_SIZE],
    count: [u8; BINARY_COUNT_SIZE],
    record: [u8; BINARY_RECORD_SIZE],
    /// Bytes accumulated in the current header, counter or record.
    filled: usize,
    attribute_len: usize,
    declared: u32,
    parsed: u32,
    offset: u64,
    ascii_signature: bool,
    triangle: Triangle,
    error: Option<ErrorCode>,
}

impl<'a> BinaryParser<'a> {
    pub fn new(callbacks: Callbacks<'a>) -> Self {
        Self {
            state: BinaryState::Header,
            callbacks,
            header: [0u8; BINARY_HEADER_SIZE],
            count: [0u8; BINARY_COUNT_SIZE],
            record: [0u8; BINARY_RECORD_SIZE],
            filled: 0,
            attribute_len: 0,
            declared: 0,
            parsed: 0,
            offset: 0,
            ascii_signature: false,
            triangle: Triangle::default(),
            error: None,
        }
    }

    pub fn state(&self) -> BinaryState {
        self.state
    }

    /// The 80 header bytes received so far.
    pub fn header(&self) -> &[u8] {
        match self.state {
            BinaryState::Header => &self.header[..self.filled],
            _ => &self.header,
        }
    }

    /// Triangle count from the file, once decoded.
    pub fn declared_count(&self) -> Option<u32> {
        match self.state {
            BinaryState::Header | BinaryState::Count => None,
            _ => Some(self.declared),
        }
    }

    /// True when the header begins with `solid `, the ASCII STL prologue.
    pub fn header_has_ascii_signature(&self) -> bool {
        self.ascii_signature
    }

    /// Code of the failure that stopped the parser, if any.
    pub fn error(&self) -> Option<ErrorCode> {
        self.error
    }

    fn step(&mut self, byte: u8) -> StlResult<Status> {
        self.offset += 1;
        match self.state {
            BinaryState::Header => {
                // Track the ASCII prologue while the header streams in.
                if self.filled < ASCII_HEADER_PREFIX.len() {
                    let matched = byte == ASCII_HEADER_PREFIX[self.filled];
                    self.ascii_signature = matched && (self.filled == 0 || self.ascii_signature);
                }
                self.header[self.filled] = byte;
                self.filled += 1;
                if self.filled == BINARY_HEADER_SIZE {
                    if self.ascii_signature {
                        debug!("binary STL header starts with \"solid \"");
                    }
                    self.filled = 0;
                    self.state = BinaryState::Count;
                }
                Ok(Status::Ok)
            }
            BinaryState::Count => {
                self.count[self.filled] = byte;
                self.filled += 1;
                if self.filled < BINARY_COUNT_SIZE {
                    return Ok(Status::Ok);
                }
                self.declared = LittleEndian::read_u32(&self.count);
                self.filled = 0;
                debug!("binary STL declares {} triangles", self.declared);
                if self.declared == 0 {
                    return self.complete();
                }
                self.state = BinaryState::Triangle;
                Ok(Status::Ok)
            }
            BinaryState::Triangle => {
                self.record[self.filled] = byte;
                self.filled += 1;
                if self.filled < BINARY_RECORD_SIZE {
                    return Ok(Status::Ok);
                }
                self.filled = 0;
                self.attribute_len = self.triangle.read_binary_record(&self.record);
                if self.attribute_len == 0 {
                    return self.emit();
                }
                self.triangle
                    .attributes
                    .try_reserve_exact(self.attribute_len)
                    .map_err(|_| {
                        StlError::out_of_memory(format!(
                            "cannot allocate {} attribute bytes",
                            self.attribute_len
                        ))
                    })?;
                self.state = BinaryState::Attributes;
                Ok(Status::Ok)
            }
            BinaryState::Attributes => {
                self.triangle.attributes.push(byte);
                if self.triangle.attributes.len() < self.attribute_len {
                    return Ok(Status::Ok);
                }
                self.emit()
            }
            BinaryState::Done | BinaryState::Error => Err(StlError::invalid_state(
                "binary parser no longer accepts input",
            )),
        }
    }

    /// Validates and delivers the completed record.
    fn emit(&mut self) -> StlResult<Status> {
        let record_offset = self.offset - (BINARY_RECORD_SIZE + self.attribute_len) as u64;
        let callbacks = &mut self.callbacks;
        let verdict = validate::validate(&mut self.triangle, record_offset, &mut |event| {
            callbacks.error(event)
        })?;
        if verdict == Verdict::Accept {
            trace!("triangle {} at byte {}", self.parsed, record_offset);
            self.callbacks.triangle(&self.triangle)?;
        }
        // The attribute buffer only lives for the duration of the callback.
        if !self.triangle.attributes.is_empty() {
            self.triangle.attributes = Vec::new();
        }
        self.attribute_len = 0;
        self.parsed += 1;
        if self.parsed == self.declared {
            return self.complete();
        }
        self.state = BinaryState::Triangle;
        Ok(Status::Ok)
    }

    fn complete(&mut self) -> StlResult<Status> {
        debug!("binary STL complete after {} triangles", self.parsed);
        self.state = BinaryState::Done;
        self.callbacks.eof()?;
        Ok(Status::Done)
    }

    fn fail(&mut self, err: StlError) -> StlError {
        self.state = BinaryState::Error;
        self.error = Some(err.code());
        err
    }
}

impl Parser for BinaryParser<'_> {
    fn feed_byte(&mut self, byte: u8) -> StlResult<Status> {
        if matches!(self.state, BinaryState::Done | BinaryState::Error) {
            return Err(StlError::invalid_state("binary parser no longer accepts input").at(self.offset));
        }
        self.step(byte).map_err(|err| {
            let err = if err.position() == 0 { err.at(self.offset) } else { err };
            self.fail(err)
        })
    }

    fn finish(&mut self) -> StlResult<Status> {
        let unit = match self.state {
            BinaryState::Done => return Ok(Status::Done),
            BinaryState::Error => {
                return Err(StlError::invalid_state("binary parser already failed").at(self.offset))
            }
            BinaryState::Header => "header",
            BinaryState::Count => "triangle count",
            BinaryState::Triangle | BinaryState::Attributes => "triangle record",
        };
        let mut message = format!(
            "input ended inside {unit} after {} of {} triangles",
            self.parsed, self.declared
        );
        if self.ascii_signature {
            message.push_str("; header starts with \"solid \", input is probably ASCII STL");
        }
        Err(self.fail(StlError::unexpected_end(message).at(self.offset)))
    }

    fn triangles_parsed(&self) -> u64 {
        u64::from(self.parsed)
    }

    fn position(&self) -> u64 {
        self.offset
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, BinaryState::Done | BinaryState::Error)
    }
}
