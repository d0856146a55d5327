//! The triangle record shared by every parser and writer.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{StlError, StlResult};
use crate::vector::Vec3;

/// Size of the free-form binary STL header.
pub const BINARY_HEADER_SIZE: usize = 80;

/// Size of the little-endian triangle counter that follows the header.
pub const BINARY_COUNT_SIZE: usize = 4;

/// Size of the fixed part of a binary triangle record:
/// 12 x f32 (normal + 3 vertices) and a u16 attribute byte count.
pub const BINARY_RECORD_SIZE: usize = 50;

/// Largest attribute payload a binary record can declare.
pub const MAX_ATTRIBUTE_BYTES: usize = u16::MAX as usize;

/// One facet of an STL surface.
///
/// Vertices are expected in counter-clockwise order around `normal`
/// (right-hand rule). Attribute bytes only exist in binary files; triangles
/// decoded from ASCII always carry an empty buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Triangle {
    pub normal: Vec3,
    pub vertices: [Vec3; 3],
    pub attributes: Vec<u8>,
}

impl Triangle {
    /// Creates a triangle without attribute bytes.
    pub fn new(normal: Vec3, vertices: [Vec3; 3]) -> Self {
        Self {
            normal,
            vertices,
            attributes: Vec::new(),
        }
    }

    /// Attaches an attribute payload.
    pub fn with_attributes(mut self, attributes: impl Into<Vec<u8>>) -> Self {
        self.attributes = attributes.into();
        self
    }

    /// Number of attribute bytes attached to this triangle.
    pub fn attribute_count(&self) -> u32 {
        self.attributes.len() as u32
    }

    /// Size of this triangle once serialized in binary form.
    pub fn binary_size(&self) -> usize {
        BINARY_RECORD_SIZE + self.attributes.len()
    }

    /// Swaps vertices 1 and 2, reversing the winding.
    pub fn flip_winding(&mut self) {
        self.vertices.swap(1, 2);
    }

    /// Overwrites the fixed fields from a 50-byte binary record and returns the
    /// declared attribute byte count. The attribute buffer is left untouched.
    pub fn read_binary_record(&mut self, record: &[u8; BINARY_RECORD_SIZE]) -> usize {
        let mut floats = [0f32; 12];
        LittleEndian::read_f32_into(&record[..48], &mut floats);
        self.normal = [floats[0] as f64, floats[1] as f64, floats[2] as f64];
        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let base = 3 + i * 3;
            *vertex = [
                floats[base] as f64,
                floats[base + 1] as f64,
                floats[base + 2] as f64,
            ];
        }
        LittleEndian::read_u16(&record[48..50]) as usize
    }

    /// Serializes the fixed 50-byte record, narrowing every component to f32.
    pub fn write_binary_record(&self, record: &mut [u8; BINARY_RECORD_SIZE]) -> StlResult<()> {
        if self.attributes.len() > MAX_ATTRIBUTE_BYTES {
            return Err(StlError::invalid_parameter(format!(
                "{} attribute bytes do not fit a binary record",
                self.attributes.len()
            )));
        }
        let mut floats = [0f32; 12];
        floats[..3].copy_from_slice(&narrow(self.normal));
        for (i, vertex) in self.vertices.iter().enumerate() {
            floats[3 + i * 3..6 + i * 3].copy_from_slice(&narrow(*vertex));
        }
        LittleEndian::write_f32_into(&floats, &mut record[..48]);
        LittleEndian::write_u16(&mut record[48..50], self.attributes.len() as u16);
        Ok(())
    }
}

fn narrow(v: Vec3) -> [f32; 3] {
    [v[0] as f32, v[1] as f32, v[2] as f32]
}
