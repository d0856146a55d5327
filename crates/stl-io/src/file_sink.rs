//! File-backed [`Sink`].

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;
use stl_core::{Sink, StlError, StlResult};

/// Buffered file sink.
///
/// `WouldBlock` and `Interrupted` are reported to the writer as a zero-byte
/// write, so it returns `Continues` instead of failing.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Creates (or truncates) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> StlResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self::from_file(file, path))
    }

    /// Wraps an already opened file.
    pub fn from_file(file: File, path: PathBuf) -> Self {
        Self {
            path,
            writer: Some(BufWriter::new(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.writer.is_none()
    }

    fn writer(&mut self) -> StlResult<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| StlError::invalid_state("file sink already released"))
    }
}

impl Sink for FileSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> StlResult<usize> {
        match self.writer()?.write(bytes) {
            Ok(n) => Ok(n),
            Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                Ok(0)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn seek_absolute(&mut self, offset: u64) -> StlResult<()> {
        self.writer()?.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn seek_relative(&mut self, delta: i64) -> StlResult<()> {
        self.writer()?.seek(SeekFrom::Current(delta))?;
        Ok(())
    }

    fn release(&mut self) -> StlResult<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| StlError::invalid_state("file sink already released"))?;
        let file = writer.into_inner().map_err(|err| StlError::from(err.into_error()))?;
        file.sync_all()?;
        debug!("closed {}", self.path.display());
        Ok(())
    }
}
