//! Output sink contract used by the writers.
//!
//! A sink is the caller's capability to write and seek. It decides how much of
//! each write it accepts; accepting zero bytes means "try again later" and
//! makes the writer suspend with [`Status::Continues`](crate::Status::Continues).

use crate::error::{StlError, StlResult};

/// Write/seek/release capability targeted by writers.
pub trait Sink {
    /// Writes a prefix of `bytes` and returns its length. `Ok(0)` for a
    /// non-empty slice means the sink cannot take more right now.
    fn write_bytes(&mut self, bytes: &[u8]) -> StlResult<usize>;

    /// Moves the write position to `offset` bytes from the start.
    fn seek_absolute(&mut self, offset: u64) -> StlResult<()>;

    /// Moves the write position by `delta` bytes.
    fn seek_relative(&mut self, delta: i64) -> StlResult<()>;

    /// Flushes and gives up the underlying transport. Called at most once by a writer.
    fn release(&mut self) -> StlResult<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write_bytes(&mut self, bytes: &[u8]) -> StlResult<usize> {
        (**self).write_bytes(bytes)
    }

    fn seek_absolute(&mut self, offset: u64) -> StlResult<()> {
        (**self).seek_absolute(offset)
    }

    fn seek_relative(&mut self, delta: i64) -> StlResult<()> {
        (**self).seek_relative(delta)
    }

    fn release(&mut self) -> StlResult<()> {
        (**self).release()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write_bytes(&mut self, bytes: &[u8]) -> StlResult<usize> {
        (**self).write_bytes(bytes)
    }

    fn seek_absolute(&mut self, offset: u64) -> StlResult<()> {
        (**self).seek_absolute(offset)
    }

    fn seek_relative(&mut self, delta: i64) -> StlResult<()> {
        (**self).seek_relative(delta)
    }

    fn release(&mut self) -> StlResult<()> {
        (**self).release()
    }
}

/// In-memory sink.
///
/// An optional byte budget simulates back-pressure: once the budget is spent,
/// writes accept zero bytes until [`VecSink::grant`] adds more.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    data: Vec<u8>,
    pos: usize,
    budget: Option<usize>,
    releases: usize,
}

impl VecSink {
    /// Creates an unlimited sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that accepts `budget` bytes before stalling.
    pub fn with_budget(budget: usize) -> Self {
        Self {
            budget: Some(budget),
            ..Self::default()
        }
    }

    /// Allows `bytes` more bytes to be written.
    pub fn grant(&mut self, bytes: usize) {
        if let Some(budget) = self.budget.as_mut() {
            *budget += bytes;
        }
    }

    /// Removes the budget.
    pub fn unlimit(&mut self) {
        self.budget = None;
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of times [`Sink::release`] was called.
    pub fn release_count(&self) -> usize {
        self.releases
    }

    fn check_open(&self) -> StlResult<()> {
        if self.releases > 0 {
            return Err(StlError::invalid_state("sink already released"));
        }
        Ok(())
    }
}

impl Sink for VecSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> StlResult<usize> {
        self.check_open()?;
        let n = match self.budget.as_mut() {
            Some(budget) => {
                let n = bytes.len().min(*budget);
                *budget -= n;
                n
            }
            None => bytes.len(),
        };
        let end = self.pos + n;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(&bytes[..n]);
        self.pos = end;
        Ok(n)
    }

    fn seek_absolute(&mut self, offset: u64) -> StlResult<()> {
        self.check_open()?;
        let offset = usize::try_from(offset)
            .ok()
            .filter(|&o| o <= self.data.len())
            .ok_or_else(|| StlError::invalid_parameter(format!("seek to {offset} past end")))?;
        self.pos = offset;
        Ok(())
    }

    fn seek_relative(&mut self, delta: i64) -> StlResult<()> {
        let target = self.pos as i64 + delta;
        if target < 0 {
            return Err(StlError::invalid_parameter("seek before start"));
        }
        self.seek_absolute(target as u64)
    }

    fn release(&mut self) -> StlResult<()> {
        self.check_open()?;
        self.releases += 1;
        Ok(())
    }
}
