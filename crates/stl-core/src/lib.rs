//! STL Core Library
//!
//! Incremental parsers and writers for the ASCII and binary STL triangle
//! mesh formats, plus per-triangle winding/normal validation and repair.
//!
//! Parsers are push-driven: the caller feeds bytes (one at a time or in
//! blocks) and decoded triangles come out through [`Callbacks`]. Writers are
//! pull-driven by a caller-supplied [`Sink`]; a sink that accepts fewer bytes
//! than offered makes the writer return [`Status::Continues`], after which
//! [`Writer::resume`] picks up at the exact byte where output stopped.
//!
//! ```
//! use stl_core::{
//!     AsciiWriterOptions, Callbacks, LineEnding, Parser, StlFormat, StlParser, StlWriter,
//!     Triangle, VecSink, Writer,
//! };
//!
//! let mut sink = VecSink::new();
//! {
//!     let opts = AsciiWriterOptions::new().with_line_ending(LineEnding::Lf);
//!     let mut writer = StlWriter::ascii(&mut sink, opts).unwrap();
//!     let tri = Triangle::new(
//!         [0.0, 0.0, 1.0],
//!         [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     );
//!     let _ = writer.write_triangle(&tri).unwrap();
//!     let _ = writer.finalize().unwrap();
//! }
//!
//! let mut count = 0;
//! let mut parser = StlParser::new(
//!     StlFormat::detect(sink.data()),
//!     Callbacks::new().on_triangle(|_| {
//!         count += 1;
//!         Ok(())
//!     }),
//! );
//! let _ = parser.parse_buffer(sink.data()).unwrap();
//! drop(parser);
//! assert_eq!(count, 1);
//! ```
//!
//! # Features
//!
//! - `validation` (default): check every parsed or written triangle. When
//!   disabled, triangles pass through unchecked.
//! - `solid-name-check`: require the `endsolid` name of an ASCII file to match
//!   its `solid` name.

pub mod ascii_parser;
pub mod ascii_writer;
pub mod binary_parser;
pub mod binary_writer;
pub mod callbacks;
pub mod error;
pub mod format;
pub mod number;
pub mod options;
pub mod parser;
pub mod sink;
pub mod triangle;
pub mod validate;
pub mod vector;
pub mod writer;

pub use ascii_parser::{AsciiParser, AsciiState};
pub use ascii_writer::AsciiWriter;
pub use binary_parser::{BinaryParser, BinaryState};
pub use binary_writer::BinaryWriter;
pub use callbacks::{Callbacks, ErrorEvent};
pub use error::{ErrorCode, Recovery, Status, StlError, StlResult};
pub use format::StlFormat;
pub use options::{
    AsciiWriterOptions, BinaryWriterOptions, LineEnding, NormalMode, WriterConfig,
    DEFAULT_PRECISION, DEFAULT_SOLID_NAME,
};
pub use parser::{Parser, StlParser};
pub use sink::{Sink, VecSink};
pub use triangle::{
    Triangle, BINARY_COUNT_SIZE, BINARY_HEADER_SIZE, BINARY_RECORD_SIZE, MAX_ATTRIBUTE_BYTES,
};
pub use validate::{Verdict, NORMAL_EPSILON, STORAGE_ROUNDING};
pub use vector::Vec3;
pub use writer::{StlWriter, Writer, WriterState};
