//! Common writer interface and the format-selecting [`StlWriter`].

use crate::ascii_writer::AsciiWriter;
use crate::binary_writer::BinaryWriter;
use crate::callbacks::ErrorEvent;
use crate::error::{Recovery, Status, StlResult};
use crate::format::StlFormat;
use crate::options::{AsciiWriterOptions, BinaryWriterOptions, WriterConfig};
use crate::sink::Sink;
use crate::triangle::Triangle;

/// Writer progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterState {
    /// The file header has not been fully accepted by the sink yet.
    Header,
    /// Ready for the next triangle.
    Accepting,
    /// A triangle record is partially written.
    Flushing,
    /// The trailer is being written.
    Finalizing,
    Done,
    Error,
}

/// Incremental encoder targeting a [`Sink`].
///
/// Every step may return [`Status::Continues`] when the sink stops accepting
/// bytes. The caller then calls [`Writer::resume`] (possibly much later) until
/// it returns something else; the output continues at the exact byte where the
/// sink stalled.
pub trait Writer {
    /// Validates and serializes one triangle.
    ///
    /// Fails with `InvalidState` while earlier output is still pending.
    fn write_triangle(&mut self, triangle: &Triangle) -> StlResult<Status>;

    /// Continues pending output: the header, a triangle record or the trailer.
    fn resume(&mut self) -> StlResult<Status>;

    /// Writes the trailer and releases the sink. Returns [`Status::Done`] once
    /// complete; may be called again after a resumable failure.
    fn finalize(&mut self) -> StlResult<Status>;

    /// Releases the sink if it was not released yet. The writer accepts no
    /// further calls afterwards.
    fn release(&mut self) -> StlResult<()>;

    fn state(&self) -> WriterState;

    /// Number of triangles whose record was completely accepted by the sink.
    fn triangles_written(&self) -> u32;
}

/// Pushes `bytes[*cursor..]` into `sink`, advancing the cursor. Returns
/// `false` when the sink stalls before the end.
pub(crate) fn flush_from<S: Sink>(sink: &mut S, bytes: &[u8], cursor: &mut usize) -> StlResult<bool> {
    while *cursor < bytes.len() {
        let accepted = sink.write_bytes(&bytes[*cursor..])?;
        if accepted == 0 {
            return Ok(false);
        }
        *cursor += accepted.min(bytes.len() - *cursor);
    }
    Ok(true)
}

/// Writer for either STL variant, chosen at construction.
#[derive(Debug)]
pub enum StlWriter<'a, S: Sink> {
    Binary(BinaryWriter<'a, S>),
    Ascii(AsciiWriter<'a, S>),
}

impl<'a, S: Sink> StlWriter<'a, S> {
    /// Creates the writer selected by `config`; header output starts at once.
    pub fn new(sink: S, config: WriterConfig) -> StlResult<Self> {
        match config {
            WriterConfig::Binary(opts) => Self::binary(sink, opts),
            WriterConfig::Ascii(opts) => Self::ascii(sink, opts),
        }
    }

    pub fn binary(sink: S, options: BinaryWriterOptions) -> StlResult<Self> {
        BinaryWriter::new(sink, options).map(StlWriter::Binary)
    }

    pub fn ascii(sink: S, options: AsciiWriterOptions) -> StlResult<Self> {
        AsciiWriter::new(sink, options).map(StlWriter::Ascii)
    }

    /// Sets the callback consulted when a triangle fails validation.
    pub fn on_error<F>(self, f: F) -> Self
    where
        F: FnMut(&ErrorEvent<'_>) -> Recovery + 'a,
    {
        match self {
            StlWriter::Binary(w) => StlWriter::Binary(w.on_error(f)),
            StlWriter::Ascii(w) => StlWriter::Ascii(w.on_error(f)),
        }
    }

    pub fn format(&self) -> StlFormat {
        match self {
            StlWriter::Binary(_) => StlFormat::Binary,
            StlWriter::Ascii(_) => StlFormat::Ascii,
        }
    }
}

impl<S: Sink> Writer for StlWriter<'_, S> {
    fn write_triangle(&mut self, triangle: &Triangle) -> StlResult<Status> {
        match self {
            StlWriter::Binary(w) => w.write_triangle(triangle),
            StlWriter::Ascii(w) => w.write_triangle(triangle),
        }
    }

    fn resume(&mut self) -> StlResult<Status> {
        match self {
            StlWriter::Binary(w) => w.resume(),
            StlWriter::Ascii(w) => w.resume(),
        }
    }

    fn finalize(&mut self) -> StlResult<Status> {
        match self {
            StlWriter::Binary(w) => w.finalize(),
            StlWriter::Ascii(w) => w.finalize(),
        }
    }

    fn release(&mut self) -> StlResult<()> {
        match self {
            StlWriter::Binary(w) => w.release(),
            StlWriter::Ascii(w) => w.release(),
        }
    }

    fn state(&self) -> WriterState {
        match self {
            StlWriter::Binary(w) => w.state(),
            StlWriter::Ascii(w) => w.state(),
        }
    }

    fn triangles_written(&self) -> u32 {
        match self {
            StlWriter::Binary(w) => w.triangles_written(),
            StlWriter::Ascii(w) => w.triangles_written(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::VecSink;

    #[test]
    fn flush_from_stops_on_stall() {
        let mut sink = VecSink::with_budget(4);
        let mut cursor = 0;
        assert!(!flush_from(&mut sink, b"abcdefgh", &mut cursor).unwrap());
        assert_eq!(cursor, 4);
        sink.grant(100);
        assert!(flush_from(&mut sink, b"abcdefgh", &mut cursor).unwrap());
        assert_eq!(sink.data(), b"abcdefgh");
    }

    #[test]
    fn config_selects_variant() {
        let mut sink = VecSink::new();
        let writer = StlWriter::new(&mut sink, WriterConfig::for_format(StlFormat::Ascii)).unwrap();
        assert_eq!(writer.format(), StlFormat::Ascii);
        assert_eq!(writer.state(), WriterState::Accepting);
    }
}
