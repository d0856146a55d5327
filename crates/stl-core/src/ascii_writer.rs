//! Incremental ASCII STL encoder.
//!
//! Output is produced one field at a time (a keyword or a number together with
//! its trailing separator). Only the current field is rendered, and a byte
//! cursor into it lets the writer stop and resume anywhere, even inside a
//! number.

use std::fmt;

use log::{debug, trace, warn};

use crate::callbacks::{self, ErrorCallback, ErrorEvent};
use crate::error::{ErrorCode, Recovery, Status, StlError, StlResult};
use crate::number::format_g;
use crate::options::AsciiWriterOptions;
use crate::sink::Sink;
use crate::triangle::Triangle;
use crate::validate::{self, Verdict};
use crate::writer::{flush_from, Writer, WriterState};

/// Lines per facet block.
const LINES_PER_FACET: u64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Solid,
    FacetNormal,
    Normal(usize),
    OuterLoop,
    Vertex(usize),
    Coord(usize),
    EndLoop,
    EndFacet,
    EndSolid,
}

impl Field {
    /// Field following `self` within the same facet block.
    fn next(self) -> Option<Field> {
        Some(match self {
            Field::FacetNormal => Field::Normal(0),
            Field::Normal(2) => Field::OuterLoop,
            Field::Normal(i) => Field::Normal(i + 1),
            Field::OuterLoop => Field::Vertex(0),
            Field::Vertex(k) => Field::Coord(k * 3),
            Field::Coord(8) => Field::EndLoop,
            Field::Coord(j) if j % 3 == 2 => Field::Vertex(j / 3 + 1),
            Field::Coord(j) => Field::Coord(j + 1),
            Field::EndLoop => Field::EndFacet,
            Field::EndFacet | Field::Solid | Field::EndSolid => return None,
        })
    }
}

/// ASCII STL writer.
pub struct AsciiWriter<'a, S: Sink> {
    sink: S,
    options: AsciiWriterOptions,
    on_error: Option<ErrorCallback<'a>>,
    state: WriterState,
    field: Field,
    text: Vec<u8>,
    cursor: usize,
    written: u32,
    scratch: Triangle,
    released: bool,
}

impl<'a, S: Sink> AsciiWriter<'a, S> {
    /// Creates the writer and starts sending the `solid` line.
    ///
    /// The solid name may only contain letters, digits, space and `. - + _`.
    pub fn new(sink: S, options: AsciiWriterOptions) -> StlResult<Self> {
        if let Some(bad) = options
            .solid_name
            .bytes()
            .find(|&b| !(b.is_ascii_alphanumeric() || matches!(b, b' ' | b'.' | b'-' | b'+' | b'_')))
        {
            return Err(StlError::invalid_parameter(format!(
                "byte 0x{bad:02x} is not allowed in an ASCII STL solid name"
            )));
        }
        let mut writer = Self {
            sink,
            options,
            on_error: None,
            state: WriterState::Header,
            field: Field::Solid,
            text: Vec::with_capacity(64),
            cursor: 0,
            written: 0,
            scratch: Triangle::default(),
            released: false,
        };
        writer.start(Field::Solid);
        let _ = writer.resume()?;
        Ok(writer)
    }

    /// Sets the callback consulted when a triangle fails validation or
    /// carries attribute bytes.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&ErrorEvent<'_>) -> Recovery + 'a,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn options(&self) -> &AsciiWriterOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Line number of the next `facet` line.
    fn facet_line(&self) -> u64 {
        2 + LINES_PER_FACET * u64::from(self.written)
    }

    fn check_open(&self) -> StlResult<()> {
        if self.released {
            return Err(StlError::invalid_state("writer already released"));
        }
        Ok(())
    }

    fn fail(&mut self, err: StlError) -> StlError {
        self.state = WriterState::Error;
        err
    }

    /// Renders `field` and resets the cursor.
    fn start(&mut self, field: Field) {
        self.field = field;
        self.cursor = 0;
        self.text.clear();
        let eol = self.options.line_ending.as_bytes();
        let blank: &[u8] = b" ";
        let precision = self.options.precision;
        match field {
            Field::Solid | Field::EndSolid => {
                let keyword: &[u8] = if field == Field::Solid {
                    b"solid"
                } else {
                    b"endsolid"
                };
                self.text.extend_from_slice(keyword);
                if !self.options.solid_name.is_empty() {
                    self.text.push(b' ');
                    self.text.extend_from_slice(self.options.solid_name.as_bytes());
                }
                self.text.extend_from_slice(eol);
            }
            Field::FacetNormal => self.text.extend_from_slice(b"facet normal "),
            Field::Normal(i) => {
                format_g(self.scratch.normal[i], precision, &mut self.text);
                self.text.extend_from_slice(if i == 2 { eol } else { blank });
            }
            Field::OuterLoop => {
                self.text.extend_from_slice(b" outer loop");
                self.text.extend_from_slice(eol);
            }
            Field::Vertex(_) => self.text.extend_from_slice(b"  vertex "),
            Field::Coord(j) => {
                format_g(self.scratch.vertices[j / 3][j % 3], precision, &mut self.text);
                self.text.extend_from_slice(if j % 3 == 2 { eol } else { blank });
            }
            Field::EndLoop => {
                self.text.extend_from_slice(b" endloop");
                self.text.extend_from_slice(eol);
            }
            Field::EndFacet => {
                self.text.extend_from_slice(b"endfacet");
                self.text.extend_from_slice(eol);
            }
        }
    }

    /// Sends the current field and the ones after it. Returns `false` when
    /// the sink stalls.
    fn pump(&mut self) -> StlResult<bool> {
        loop {
            match flush_from(&mut self.sink, &self.text, &mut self.cursor) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(err) => return Err(self.fail(err)),
            }
            match self.field.next() {
                Some(field) => self.start(field),
                None => return Ok(true),
            }
        }
    }

    /// Deals with attribute bytes, which ASCII STL cannot carry.
    fn drop_attributes(&mut self, triangle: &Triangle) -> StlResult<Verdict> {
        let position = self.facet_line();
        let event = ErrorEvent {
            code: ErrorCode::AttributesNotSupported,
            position,
            triangle: Some(triangle),
        };
        match callbacks::recover(&mut self.on_error, &event) {
            Recovery::Skip => {
                warn!("skipping triangle with {} attribute bytes", triangle.attributes.len());
                Ok(Verdict::Skip)
            }
            Recovery::Keep => {
                warn!("dropping {} attribute bytes", triangle.attributes.len());
                self.scratch.attributes.clear();
                Ok(Verdict::Accept)
            }
            _ => Err(self.fail(
                StlError::new(
                    ErrorCode::AttributesNotSupported,
                    format!(
                        "ASCII STL cannot store {} attribute bytes",
                        triangle.attributes.len()
                    ),
                )
                .at(position),
            )),
        }
    }
}

impl<S: Sink> Writer for AsciiWriter<'_, S> {
    fn write_triangle(&mut self, triangle: &Triangle) -> StlResult<Status> {
        self.check_open()?;
        match self.state {
            WriterState::Accepting => {}
            WriterState::Header | WriterState::Flushing => {
                return Err(StlError::invalid_state(
                    "previous output is still pending; call resume first",
                ))
            }
            other => {
                return Err(StlError::invalid_state(format!(
                    "cannot write a triangle in state {other:?}"
                )))
            }
        }

        self.scratch.clone_from(triangle);
        if !triangle.attributes.is_empty() && self.drop_attributes(triangle)? == Verdict::Skip {
            return Ok(Status::Ok);
        }
        let position = self.facet_line();
        let on_error = &mut self.on_error;
        let verdict = validate::apply_normal_mode(
            &mut self.scratch,
            self.options.normal_mode,
            position,
            &mut |event| callbacks::recover(on_error, event),
        )
        .map_err(|err| {
            self.state = WriterState::Error;
            err
        })?;
        if verdict == Verdict::Skip {
            return Ok(Status::Ok);
        }
        // The ASCII grammar has no spelling for nan or inf.
        let finite = self
            .scratch
            .normal
            .iter()
            .chain(self.scratch.vertices.iter().flatten())
            .all(|c| c.is_finite());
        if !finite {
            return Err(StlError::invalid_parameter("ASCII STL cannot encode non-finite values")
                .at(position));
        }

        self.start(Field::FacetNormal);
        self.state = WriterState::Flushing;
        self.resume()
    }

    fn resume(&mut self) -> StlResult<Status> {
        if self.state == WriterState::Done {
            return Ok(Status::Done);
        }
        self.check_open()?;
        match self.state {
            WriterState::Header => {
                if !self.pump()? {
                    return Ok(Status::Continues);
                }
                debug!("ASCII STL solid \"{}\" opened", self.options.solid_name);
                self.state = WriterState::Accepting;
                Ok(Status::Ok)
            }
            WriterState::Flushing => {
                if !self.pump()? {
                    return Ok(Status::Continues);
                }
                trace!("triangle {} written at line {}", self.written, self.facet_line());
                self.written = self.written.saturating_add(1);
                self.state = WriterState::Accepting;
                Ok(Status::Ok)
            }
            WriterState::Finalizing => self.finalize(),
            WriterState::Accepting => Ok(Status::Ok),
            WriterState::Done => Ok(Status::Done),
            WriterState::Error => Err(StlError::invalid_state("writer failed earlier")),
        }
    }

    fn finalize(&mut self) -> StlResult<Status> {
        if self.state == WriterState::Done {
            return Ok(Status::Done);
        }
        self.check_open()?;
        match self.state {
            WriterState::Accepting => {
                self.start(Field::EndSolid);
                self.state = WriterState::Finalizing;
            }
            WriterState::Finalizing => {}
            WriterState::Done => return Ok(Status::Done),
            WriterState::Header | WriterState::Flushing => {
                return Err(StlError::invalid_state(
                    "previous output is still pending; call resume first",
                ))
            }
            WriterState::Error => return Err(StlError::invalid_state("writer failed earlier")),
        }
        if !self.pump()? {
            return Ok(Status::Continues);
        }

        self.released = true;
        if let Err(err) = self.sink.release() {
            return Err(self.fail(err));
        }
        self.state = WriterState::Done;
        debug!("ASCII STL finalized with {} triangles", self.written);
        Ok(Status::Done)
    }

    fn release(&mut self) -> StlResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.sink.release()
    }

    fn state(&self) -> WriterState {
        self.state
    }

    fn triangles_written(&self) -> u32 {
        self.written
    }
}

impl<S: Sink> Drop for AsciiWriter<'_, S> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(err) = self.sink.release() {
                warn!("releasing sink on drop failed: {err}");
            }
        }
    }
}

impl<S: Sink> fmt::Debug for AsciiWriter<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsciiWriter")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("field", &self.field)
            .field("written", &self.written)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
