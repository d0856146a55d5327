//! Incremental binary STL encoder.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace, warn};

use crate::callbacks::{self, ErrorCallback, ErrorEvent};
use crate::error::{ErrorCode, Recovery, Status, StlError, StlResult};
use crate::options::BinaryWriterOptions;
use crate::sink::Sink;
use crate::triangle::{Triangle, BINARY_COUNT_SIZE, BINARY_HEADER_SIZE, BINARY_RECORD_SIZE};
use crate::validate::{self, Verdict};
use crate::writer::{flush_from, Writer, WriterState};

/// Binary STL writer.
///
/// The header and a zero triangle count are sent to the sink at construction.
/// [`Writer::finalize`] seeks back to offset 80 and overwrites the count with
/// the number of triangles actually written, so the sink must support
/// [`Sink::seek_absolute`].
pub struct BinaryWriter<'a, S: Sink> {
    sink: S,
    options: BinaryWriterOptions,
    on_error: Option<ErrorCallback<'a>>,
    state: WriterState,
    pending: Vec<u8>,
    cursor: usize,
    seek_pending: bool,
    written: u32,
    /// Offset of the next record.
    offset: u64,
    scratch: Triangle,
    released: bool,
}

impl<'a, S: Sink> BinaryWriter<'a, S> {
    /// Creates the writer and starts sending the header.
    ///
    /// If the sink stalls, the writer stays in [`WriterState::Header`] until
    /// [`Writer::resume`] gets the rest through.
    pub fn new(sink: S, options: BinaryWriterOptions) -> StlResult<Self> {
        let mut pending = Vec::with_capacity(BINARY_HEADER_SIZE + BINARY_COUNT_SIZE);
        pending.extend_from_slice(&options.header);
        pending.extend_from_slice(&[0u8; BINARY_COUNT_SIZE]);
        let mut writer = Self {
            sink,
            options,
            on_error: None,
            state: WriterState::Header,
            pending,
            cursor: 0,
            seek_pending: false,
            written: 0,
            offset: (BINARY_HEADER_SIZE + BINARY_COUNT_SIZE) as u64,
            scratch: Triangle::default(),
            released: false,
        };
        let _ = writer.resume()?;
        Ok(writer)
    }

    /// Sets the callback consulted when a triangle fails validation.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&ErrorEvent<'_>) -> Recovery + 'a,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn options(&self) -> &BinaryWriterOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn check_open(&self) -> StlResult<()> {
        if self.released {
            return Err(StlError::invalid_state("writer already released"));
        }
        Ok(())
    }

    fn flush(&mut self) -> StlResult<bool> {
        flush_from(&mut self.sink, &self.pending, &mut self.cursor).map_err(|err| {
            self.state = WriterState::Error;
            err
        })
    }

    fn stage_record(&mut self) -> StlResult<()> {
        let mut record = [0u8; BINARY_RECORD_SIZE];
        self.scratch.write_binary_record(&mut record)?;
        self.pending.clear();
        self.pending
            .try_reserve(BINARY_RECORD_SIZE + self.scratch.attributes.len())
            .map_err(|_| StlError::out_of_memory("cannot allocate triangle record"))?;
        self.pending.extend_from_slice(&record);
        self.pending.extend_from_slice(&self.scratch.attributes);
        self.cursor = 0;
        Ok(())
    }
}

impl<S: Sink> Writer for BinaryWriter<'_, S> {
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
        if self.written == u32::MAX {
            return Err(StlError::invalid_state("binary triangle counter is full"));
        }

        self.scratch.clone_from(triangle);
        let on_error = &mut self.on_error;
        let verdict = validate::apply_normal_mode(
            &mut self.scratch,
            self.options.normal_mode,
            self.offset,
            &mut |event| callbacks::recover(on_error, event),
        )
        .map_err(|err| {
            self.state = WriterState::Error;
            err
        })?;
        if verdict == Verdict::Skip {
            return Ok(Status::Ok);
        }

        // The error callback may answer an allocation failure with `Keep` to
        // retry or `Skip` to drop the triangle.
        while let Err(err) = self.stage_record() {
            if err.code() != ErrorCode::OutOfMemory {
                return Err(err.at(self.offset));
            }
            let event = ErrorEvent {
                code: ErrorCode::OutOfMemory,
                position: self.offset,
                triangle: Some(&self.scratch),
            };
            match callbacks::recover(&mut self.on_error, &event) {
                Recovery::Keep => continue,
                Recovery::Skip => return Ok(Status::Ok),
                _ => return Err(err.at(self.offset)),
            }
        }
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
                if !self.flush()? {
                    return Ok(Status::Continues);
                }
                debug!("binary STL header written");
                self.state = WriterState::Accepting;
                Ok(Status::Ok)
            }
            WriterState::Flushing => {
                if !self.flush()? {
                    return Ok(Status::Continues);
                }
                trace!("triangle {} written at byte {}", self.written, self.offset);
                self.written += 1;
                self.offset += self.pending.len() as u64;
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
                self.state = WriterState::Finalizing;
                self.seek_pending = true;
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

        if self.seek_pending {
            // A failed seek leaves the writer in Finalizing so the call can be retried.
            if let Err(err) = self.sink.seek_absolute(BINARY_HEADER_SIZE as u64) {
                warn!("cannot seek to the triangle counter: {err}");
                return Err(err);
            }
            self.seek_pending = false;
            self.pending.clear();
            self.pending.resize(BINARY_COUNT_SIZE, 0);
            LittleEndian::write_u32(&mut self.pending, self.written);
            self.cursor = 0;
        }
        if !self.flush()? {
            return Ok(Status::Continues);
        }

        self.released = true;
        if let Err(err) = self.sink.release() {
            self.state = WriterState::Error;
            return Err(err);
        }
        self.state = WriterState::Done;
        debug!("binary STL finalized with {} triangles", self.written);
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

impl<S: Sink> Drop for BinaryWriter<'_, S> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(err) = self.sink.release() {
                warn!("releasing sink on drop failed: {err}");
            }
        }
    }
}

impl<S: Sink> fmt::Debug for BinaryWriter<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryWriter")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("written", &self.written)
            .field("offset", &self.offset)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
