//! STL variant detection for files and streams.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::debug;
use stl_core::format::ASCII_SIGNATURE;
use stl_core::{StlFormat, StlResult};

/// Reads up to `len` bytes, stopping early only at end of input.
pub fn read_prefix<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(len);
    reader.take(len as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

/// Classifies a file by its first five bytes.
///
/// A binary file whose free-form header starts with `solid` is reported as
/// ASCII; the ASCII parser then rejects it at the first inconsistency.
pub fn detect_file<P: AsRef<Path>>(path: P) -> StlResult<StlFormat> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let prefix = read_prefix(&mut file, ASCII_SIGNATURE.len())?;
    let format = StlFormat::detect(&prefix);
    debug!("{} detected as {format} STL", path.display());
    Ok(format)
}
