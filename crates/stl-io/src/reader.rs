//! Streaming STL file reader.
//!
//! Provides both a struct-based API (`StlReader`) and the [`read_file`]
//! function that drives a parser over a file.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::debug;
use stl_core::format::ASCII_SIGNATURE;
use stl_core::{Callbacks, Parser, Recovery, Status, StlFormat, StlParser, StlResult, Triangle};

use crate::detect::read_prefix;
use crate::mem::{read_file_mem_with, TriangleBuffer};
use crate::traits::Reader;

/// Bytes requested from the file per read.
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of [`read_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSummary {
    pub format: StlFormat,
    /// Triangle records decoded, including those skipped by the error callback.
    pub triangles_parsed: u64,
}

/// Streams the file at `path` through the parser matching its signature.
///
/// Triangles are delivered through `callbacks` as they are decoded. Reading
/// stops when the parser reports the end of the solid; trailing bytes are
/// ignored. At end of file an ASCII parser still waiting for a line
/// terminator gets a synthetic one, so `endsolid` may end the file.
pub fn read_file<P: AsRef<Path>>(path: P, callbacks: Callbacks<'_>) -> StlResult<ReadSummary> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let prefix = read_prefix(&mut file, ASCII_SIGNATURE.len())?;
    let format = StlFormat::detect(&prefix);
    debug!("reading {} as {format} STL", path.display());

    let mut parser = StlParser::new(format, callbacks);
    let mut status = parser.feed(&prefix)?;
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    while status != Status::Done {
        let n = match file.read(&mut chunk) {
            Ok(0) => {
                status = parser.finish()?;
                break;
            }
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        status = parser.feed(&chunk[..n])?;
    }

    let triangles_parsed = parser.triangles_parsed();
    debug!("{}: {triangles_parsed} triangles", path.display());
    Ok(ReadSummary {
        format,
        triangles_parsed,
    })
}

/// STL file reader.
///
/// Without a recovery directive any validation failure fails the read.
#[derive(Debug)]
pub struct StlReader {
    path: PathBuf,
    format: StlFormat,
    recovery: Option<Recovery>,
}

impl StlReader {
    /// Opens an STL file and detects its variant.
    pub fn open<P: AsRef<Path>>(path: P) -> StlResult<Self> {
        let path = path.as_ref().to_path_buf();
        let format = crate::detect::detect_file(&path)?;
        Ok(Self {
            path,
            format,
            recovery: None,
        })
    }

    /// Answers every validation failure with `recovery`.
    pub fn with_recovery(mut self, recovery: Recovery) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Variant detected from the file signature.
    pub fn format(&self) -> StlFormat {
        self.format
    }

    /// Reads every accepted triangle.
    pub fn read_triangles(&mut self) -> StlResult<Vec<Triangle>> {
        let mut triangles = Vec::new();
        let mut callbacks = Callbacks::new().on_triangle(|t| {
            triangles.push(t.clone());
            Ok(())
        });
        if let Some(recovery) = self.recovery {
            callbacks = callbacks.on_error(move |_| recovery);
        }
        read_file(&self.path, callbacks)?;
        Ok(triangles)
    }

    /// Loads the file into a fixed-stride [`TriangleBuffer`].
    pub fn read_buffer(&mut self) -> StlResult<TriangleBuffer> {
        let recovery = self.recovery.unwrap_or_default();
        read_file_mem_with(&self.path, move |_| recovery)
    }
}

impl Reader for StlReader {
    fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(StlReader::open(path)?)
    }

    fn read_triangles(&mut self) -> io::Result<Vec<Triangle>> {
        Ok(StlReader::read_triangles(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stl_core::ErrorCode;

    const TWO_FACETS: &str = "solid pair\n\
facet normal 0 0 1\n outer loop\n  vertex 0 0 0\n  vertex 1 0 0\n  vertex 0 1 0\n endloop\nendfacet\n\
facet normal 0 0 -1\n outer loop\n  vertex 0 0 0\n  vertex 0 1 0\n  vertex 1 0 0\n endloop\nendfacet\n\
endsolid pair";

    #[test]
    fn reads_ascii_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.stl");
        std::fs::write(&path, TWO_FACETS).unwrap();

        let mut count = 0;
        let summary = read_file(
            &path,
            Callbacks::new().on_triangle(|_| {
                count += 1;
                Ok(())
            }),
        )
        .unwrap();
        assert_eq!(summary.format, StlFormat::Ascii);
        assert_eq!(summary.triangles_parsed, 2);
        assert_eq!(count, 2);
    }

    #[test]
    fn truncated_ascii_is_unexpected_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.stl");
        std::fs::write(&path, &TWO_FACETS[..57]).unwrap();
        let err = read_file(&path, Callbacks::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnexpectedEnd);
    }

    #[test]
    fn open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = StlReader::open(dir.path().join("absent.stl")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = <StlReader as Reader>::open(dir.path().join("absent.stl")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn reader_reports_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.stl");
        std::fs::write(&path, TWO_FACETS).unwrap();
        let mut reader = StlReader::open(&path).unwrap();
        assert_eq!(reader.format(), StlFormat::Ascii);
        let triangles = reader.read_triangles().unwrap();
        assert_eq!(triangles[1].vertices[1], [0.0, 1.0, 0.0]);
    }
}
