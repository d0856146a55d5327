//! Common parser interface and the format-selecting [`StlParser`].

use crate::ascii_parser::AsciiParser;
use crate::binary_parser::BinaryParser;
use crate::callbacks::Callbacks;
use crate::error::{Status, StlResult};
use crate::format::StlFormat;

/// Incremental decoder fed by the caller.
///
/// Bytes are pushed in; decoded triangles come out through the
/// [`Callbacks`] given at construction. Once a parser reports
/// [`Status::Done`] or fails, it accepts no further bytes.
pub trait Parser {
    /// Consumes one byte. Returns [`Status::Done`] when the stream is complete.
    fn feed_byte(&mut self, byte: u8) -> StlResult<Status>;

    /// Signals the real end of the input.
    fn finish(&mut self) -> StlResult<Status>;

    /// Number of triangle records decoded so far, including skipped ones.
    fn triangles_parsed(&self) -> u64;

    /// Byte offset (binary) or line number (ASCII) of the parser.
    fn position(&self) -> u64;

    /// True once the parser is done or failed.
    fn is_terminal(&self) -> bool;

    /// Consumes a block of bytes, one at a time.
    ///
    /// Stops at [`Status::Done`]; bytes following the end of the solid are
    /// left unconsumed.
    fn feed(&mut self, bytes: &[u8]) -> StlResult<Status> {
        for &byte in bytes {
            if self.feed_byte(byte)? == Status::Done {
                return Ok(Status::Done);
            }
        }
        Ok(Status::Ok)
    }

    /// Parses a complete in-memory file: `feed` followed by `finish`.
    fn parse_buffer(&mut self, bytes: &[u8]) -> StlResult<Status> {
        match self.feed(bytes)? {
            Status::Done => Ok(Status::Done),
            _ => self.finish(),
        }
    }
}

/// Parser for either STL variant, chosen at construction.
#[derive(Debug)]
pub enum StlParser<'a> {
    Binary(BinaryParser<'a>),
    Ascii(AsciiParser<'a>),
}

impl<'a> StlParser<'a> {
    pub fn new(format: StlFormat, callbacks: Callbacks<'a>) -> Self {
        match format {
            StlFormat::Binary => StlParser::Binary(BinaryParser::new(callbacks)),
            StlFormat::Ascii => StlParser::Ascii(AsciiParser::new(callbacks)),
        }
    }

    pub fn format(&self) -> StlFormat {
        match self {
            StlParser::Binary(_) => StlFormat::Binary,
            StlParser::Ascii(_) => StlFormat::Ascii,
        }
    }
}

impl Parser for StlParser<'_> {
    fn feed_byte(&mut self, byte: u8) -> StlResult<Status> {
        match self {
            StlParser::Binary(p) => p.feed_byte(byte),
            StlParser::Ascii(p) => p.feed_byte(byte),
        }
    }

    fn finish(&mut self) -> StlResult<Status> {
        match self {
            StlParser::Binary(p) => p.finish(),
            StlParser::Ascii(p) => p.finish(),
        }
    }

    fn triangles_parsed(&self) -> u64 {
        match self {
            StlParser::Binary(p) => p.triangles_parsed(),
            StlParser::Ascii(p) => p.triangles_parsed(),
        }
    }

    fn position(&self) -> u64 {
        match self {
            StlParser::Binary(p) => p.position(),
            StlParser::Ascii(p) => p.position(),
        }
    }

    fn is_terminal(&self) -> bool {
        match self {
            StlParser::Binary(p) => p.is_terminal(),
            StlParser::Ascii(p) => p.is_terminal(),
        }
    }

    fn feed(&mut self, bytes: &[u8]) -> StlResult<Status> {
        match self {
            StlParser::Binary(p) => p.feed(bytes),
            StlParser::Ascii(p) => p.feed(bytes),
        }
    }
}
