//! Two-pass loading of an STL file into a fixed-stride record buffer.
//!
//! The first pass counts the delivered triangles and finds the largest
//! attribute payload. The second pass allocates `stride * count` bytes once and
//! copies every triangle to `i * stride`. The file is read twice; in exchange
//! the records can be addressed with plain offset arithmetic.
//!
//! Record layout (little-endian):
//!
//! ```text
//! f64[3]   normal
//! f64[9]   vertices
//! u32      attribute byte count
//! u8[n]    attribute bytes, zero padded up to the stride
//! ```

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use stl_core::callbacks::ErrorEvent;
use stl_core::{Callbacks, Recovery, StlError, StlResult, Triangle};

use crate::reader::read_file;

/// Bytes of a record before its attribute payload.
pub const RECORD_FIXED_SIZE: usize = 12 * 8 + 4;

/// Record alignment.
pub const RECORD_ALIGN: usize = 8;

/// Stride fitting records with up to `max_attributes` attribute bytes.
pub fn stride_for(max_attributes: usize) -> usize {
    (RECORD_FIXED_SIZE + max_attributes + RECORD_ALIGN - 1) / RECORD_ALIGN * RECORD_ALIGN
}

/// Triangles stored as fixed-stride records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleBuffer {
    data: Vec<u8>,
    stride: usize,
    len: usize,
}

impl TriangleBuffer {
    /// Allocates a zeroed buffer of `len` records.
    pub fn with_capacity(len: usize, max_attributes: usize) -> StlResult<Self> {
        let stride = stride_for(max_attributes);
        let size = stride
            .checked_mul(len)
            .ok_or_else(|| StlError::out_of_memory(format!("{len} records of {stride} bytes")))?;
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| StlError::out_of_memory(format!("cannot allocate {size} bytes")))?;
        data.resize(size, 0);
        Ok(Self { data, stride, len })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole record arena.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Raw bytes of record `index`, `stride` bytes long.
    pub fn record(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len {
            return None;
        }
        let start = index * self.stride;
        Some(&self.data[start..start + self.stride])
    }

    /// Decodes record `index`.
    pub fn get(&self, index: usize) -> Option<Triangle> {
        let record = self.record(index)?;
        let mut values = [0f64; 12];
        LittleEndian::read_f64_into(&record[..96], &mut values);
        let count = LittleEndian::read_u32(&record[96..RECORD_FIXED_SIZE]) as usize;
        let attributes = record.get(RECORD_FIXED_SIZE..RECORD_FIXED_SIZE + count)?;
        Some(Triangle {
            normal: [values[0], values[1], values[2]],
            vertices: [
                [values[3], values[4], values[5]],
                [values[6], values[7], values[8]],
                [values[9], values[10], values[11]],
            ],
            attributes: attributes.to_vec(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    /// Stores `triangle` as record `index`.
    pub fn set(&mut self, index: usize, triangle: &Triangle) -> StlResult<()> {
        if index >= self.len {
            return Err(StlError::invalid_parameter(format!(
                "record {index} out of {} records",
                self.len
            )));
        }
        if RECORD_FIXED_SIZE + triangle.attributes.len() > self.stride {
            return Err(StlError::invalid_parameter(format!(
                "{} attribute bytes exceed the stride of {}",
                triangle.attributes.len(),
                self.stride
            )));
        }
        let start = index * self.stride;
        let record = &mut self.data[start..start + self.stride];
        let mut values = [0f64; 12];
        values[..3].copy_from_slice(&triangle.normal);
        for (i, vertex) in triangle.vertices.iter().enumerate() {
            values[3 + i * 3..6 + i * 3].copy_from_slice(vertex);
        }
        LittleEndian::write_f64_into(&values, &mut record[..96]);
        LittleEndian::write_u32(&mut record[96..RECORD_FIXED_SIZE], triangle.attribute_count());
        let end = RECORD_FIXED_SIZE + triangle.attributes.len();
        record[RECORD_FIXED_SIZE..end].copy_from_slice(&triangle.attributes);
        record[end..].fill(0);
        Ok(())
    }
}

/// Loads every triangle of `path`; validation failures are fatal.
pub fn read_file_mem<P: AsRef<Path>>(path: P) -> StlResult<TriangleBuffer> {
    read_file_mem_with(path, |_| Recovery::Abort)
}

/// Loads every triangle of `path`, asking `on_error` how to recover from
/// validation failures. The callback sees each failure twice, once per pass,
/// and must answer consistently.
pub fn read_file_mem_with<P, F>(path: P, mut on_error: F) -> StlResult<TriangleBuffer>
where
    P: AsRef<Path>,
    F: FnMut(&ErrorEvent<'_>) -> Recovery,
{
    let path = path.as_ref();

    let mut count = 0usize;
    let mut max_attributes = 0usize;
    read_file(
        path,
        Callbacks::new()
            .on_triangle(|t| {
                count += 1;
                max_attributes = max_attributes.max(t.attributes.len());
                Ok(())
            })
            .on_error(&mut on_error),
    )?;

    let mut buffer = TriangleBuffer::with_capacity(count, max_attributes)?;
    debug!(
        "{}: {count} triangles, stride {} bytes",
        path.display(),
        buffer.stride()
    );

    let mut index = 0usize;
    read_file(
        path,
        Callbacks::new()
            .on_triangle(|t| {
                if index == count {
                    return Err(StlError::invalid_state("file changed between passes"));
                }
                buffer.set(index, t)?;
                index += 1;
                Ok(())
            })
            .on_error(&mut on_error),
    )?;
    if index != count {
        return Err(StlError::invalid_state("file changed between passes"));
    }
    Ok(buffer)
}
