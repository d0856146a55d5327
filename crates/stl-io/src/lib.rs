//! File-level reading and writing of STL meshes.
//!
//! This crate wraps the incremental codec of `stl-core` with file access:
//!
//! | Function / type          | Purpose                                          |
//! |--------------------------|--------------------------------------------------|
//! | [`detect_file`]          | ASCII/binary classification from the signature  |
//! | [`read_file`]            | streams a file through the detected parser       |
//! | [`read_file_mem`]        | two-pass load into a fixed-stride buffer         |
//! | [`write_file_mem`]       | drives a writer over a [`FileSink`] to the end   |
//! | [`StlReader`]            | struct API implementing [`Reader`]               |
//! | [`StlFileWriter`]        | struct API implementing [`Writer`]               |
//!
//! # Format detection
//!
//! A file starting with the five bytes `solid` is read as ASCII, anything else
//! as binary. The binary header is free-form, so a binary file whose header
//! starts with `solid` is misclassified; the ASCII parser then fails at the
//! first byte or keyword that does not fit the grammar.
//!
//! # Example
//!
//! ```no_run
//! use stl_io::{read_file_mem, write_file_mem};
//! use stl_core::{StlFormat, WriterConfig};
//!
//! let buffer = read_file_mem("part.stl")?;
//! println!("{} triangles, {} bytes per record", buffer.len(), buffer.stride());
//! write_file_mem("part_ascii.stl", buffer.iter(), WriterConfig::for_format(StlFormat::Ascii))?;
//! # Ok::<(), stl_core::StlError>(())
//! ```

pub mod detect;
pub mod file_sink;
pub mod mem;
pub mod reader;
pub mod traits;
pub mod writer;

pub use detect::detect_file;
pub use file_sink::FileSink;
pub use mem::{read_file_mem, read_file_mem_with, stride_for, TriangleBuffer, RECORD_FIXED_SIZE};
pub use reader::{read_file, ReadSummary, StlReader};
pub use traits::{Reader, Writer};
pub use writer::{drive, write_file_mem, write_file_mem_with, StlFileWriter};
