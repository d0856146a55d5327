//! Common traits for readers and writers.
//!
//! These traits give file-level readers and writers a uniform, `io::Result`
//! based interface, which enables generic functions:
//!
//! ```no_run
//! use std::io;
//! use stl_io::{Reader, StlFileWriter, StlReader, Writer};
//!
//! fn copy<R: Reader, W: Writer>(from: &str, to: &str) -> io::Result<()> {
//!     let triangles = R::open(from)?.read_triangles()?;
//!     let mut writer = W::new();
//!     writer.add_triangles(&triangles)?;
//!     writer.write(to)
//! }
//!
//! copy::<StlReader, StlFileWriter>("in.stl", "out.stl")?;
//! # Ok::<(), io::Error>(())
//! ```

use std::io;
use std::path::Path;

use stl_core::Triangle;

/// Common interface for triangle-mesh writers.
pub trait Writer: Sized {
    /// Create a new writer instance.
    fn new() -> Self;

    /// Add triangles to be written.
    fn add_triangles(&mut self, triangles: &[Triangle]) -> io::Result<()>;

    /// Add a single triangle.
    fn add_triangle(&mut self, triangle: &Triangle) -> io::Result<()> {
        self.add_triangles(std::slice::from_ref(triangle))
    }

    /// Write all added triangles to a file.
    fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()>;

    /// Get the number of triangles added.
    fn triangle_count(&self) -> usize;
}

/// Common interface for triangle-mesh readers.
pub trait Reader: Sized {
    /// Open a file for reading.
    fn open<P: AsRef<Path>>(path: P) -> io::Result<Self>;

    /// Read every triangle of the file.
    fn read_triangles(&mut self) -> io::Result<Vec<Triangle>>;
}
