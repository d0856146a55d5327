//! STL file writer.
//!
//! Provides both a struct-based API (`StlFileWriter`) and the
//! [`write_file_mem`] functions that drive a writer over a [`FileSink`].

use std::borrow::Borrow;
use std::io;
use std::path::Path;

use log::debug;
use stl_core::callbacks::ErrorEvent;
use stl_core::{
    Recovery, Sink, Status, StlFormat, StlResult, StlWriter, Triangle, Writer as _, WriterConfig,
};

use crate::file_sink::FileSink;
use crate::traits::Writer;

/// Writes `triangles` to `path`; validation failures are fatal.
///
/// Returns the number of triangles written.
pub fn write_file_mem<P, I>(path: P, triangles: I, config: WriterConfig) -> StlResult<u32>
where
    P: AsRef<Path>,
    I: IntoIterator,
    I::Item: Borrow<Triangle>,
{
    write_file_mem_with(path, triangles, config, |_| Recovery::Abort)
}

/// Writes `triangles` to `path`, asking `on_error` how to recover from
/// validation failures.
///
/// The writer is driven to completion: every `Continues` from the file sink is
/// answered with `resume` until the record is out or the sink fails.
pub fn write_file_mem_with<P, I, F>(
    path: P,
    triangles: I,
    config: WriterConfig,
    on_error: F,
) -> StlResult<u32>
where
    P: AsRef<Path>,
    I: IntoIterator,
    I::Item: Borrow<Triangle>,
    F: FnMut(&ErrorEvent<'_>) -> Recovery,
{
    let path = path.as_ref();
    let format = config.format();
    let sink = FileSink::create(path)?;
    let mut writer = StlWriter::new(sink, config)?.on_error(on_error);

    let status = writer.resume()?;
    drive(&mut writer, status)?;
    for triangle in triangles {
        let status = writer.write_triangle(triangle.borrow())?;
        drive(&mut writer, status)?;
    }
    let status = writer.finalize()?;
    drive(&mut writer, status)?;

    let written = writer.triangles_written();
    debug!("wrote {written} triangles to {} as {format} STL", path.display());
    Ok(written)
}

/// Answers `Continues` with `resume` until the pending step completes.
///
/// Suited to blocking sinks only: a sink that stays stalled keeps this loop
/// spinning.
pub fn drive<S: Sink>(writer: &mut StlWriter<'_, S>, mut status: Status) -> StlResult<Status> {
    while status == Status::Continues {
        status = writer.resume()?;
    }
    Ok(status)
}

/// STL file writer.
///
/// Collects triangles and writes them in one go. Binary output with
/// validated normals is the default.
#[derive(Debug, Clone, Default)]
pub struct StlFileWriter {
    config: WriterConfig,
    recovery: Option<Recovery>,
    triangles: Vec<Triangle>,
}

impl StlFileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the output variant and its options.
    pub fn with_config(mut self, config: impl Into<WriterConfig>) -> Self {
        self.config = config.into();
        self
    }

    /// Selects the output variant with default options.
    pub fn with_format(self, format: StlFormat) -> Self {
        self.with_config(WriterConfig::for_format(format))
    }

    /// Answers every validation failure with `recovery`.
    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn add_triangles(&mut self, triangles: &[Triangle]) {
        self.triangles.extend_from_slice(triangles);
    }

    /// Writes all added triangles to `path` and returns how many made it into
    /// the file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> StlResult<u32> {
        let recovery = self.recovery.unwrap_or_default();
        write_file_mem_with(path, &self.triangles, self.config.clone(), move |_| recovery)
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

impl Writer for StlFileWriter {
    fn new() -> Self {
        StlFileWriter::new()
    }

    fn add_triangles(&mut self, triangles: &[Triangle]) -> io::Result<()> {
        StlFileWriter::add_triangles(self, triangles);
        Ok(())
    }

    fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        StlFileWriter::write(self, path)?;
        Ok(())
    }

    fn triangle_count(&self) -> usize {
        StlFileWriter::triangle_count(self)
    }
}
