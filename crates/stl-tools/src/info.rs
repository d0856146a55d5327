use std::fmt;
use std::path::Path;

use stl_core::{Callbacks, Parser, Recovery, StlFormat, StlParser, Vec3};

use crate::ToolError;

/// Summary printed by `stltool info`.
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub format: StlFormat,
    /// Solid name (ASCII) or header text up to the first NUL (binary).
    pub name: String,
    /// Count stored in the binary header.
    pub declared: Option<u32>,
    pub triangles: u64,
    pub max_attributes: usize,
    pub bounds: Option<(Vec3, Vec3)>,
}

/// Parses the whole file, keeping triangles that fail validation.
pub fn collect(path: &Path) -> Result<Info, ToolError> {
    let bytes = std::fs::read(path)?;
    let format = StlFormat::detect(&bytes);

    let mut max_attributes = 0usize;
    let mut bounds: Option<(Vec3, Vec3)> = None;
    let (name, declared, triangles) = {
        let mut parser = StlParser::new(
            format,
            Callbacks::new()
                .on_triangle(|t| {
                    max_attributes = max_attributes.max(t.attributes.len());
                    for v in &t.vertices {
                        bounds = Some(match bounds {
                            None => (*v, *v),
                            Some((lo, hi)) => (
                                [lo[0].min(v[0]), lo[1].min(v[1]), lo[2].min(v[2])],
                                [hi[0].max(v[0]), hi[1].max(v[1]), hi[2].max(v[2])],
                            ),
                        });
                    }
                    Ok(())
                })
                .on_error(|_| Recovery::Keep),
        );
        parser.parse_buffer(&bytes)?;
        let triangles = parser.triangles_parsed();
        match &parser {
            StlParser::Ascii(p) => (p.solid_name().to_string(), None, triangles),
            StlParser::Binary(p) => (header_text(p.header()), p.declared_count(), triangles),
        }
    };

    Ok(Info {
        format,
        name,
        declared,
        triangles,
        max_attributes,
        bounds,
    })
}

fn header_text(header: &[u8]) -> String {
    let end = header.iter().position(|&b| b == 0).unwrap_or(header.len());
    String::from_utf8_lossy(&header[..end]).trim_end().to_string()
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "format:         {}", self.format)?;
        match self.format {
            StlFormat::Ascii => writeln!(f, "solid name:     {}", self.name)?,
            StlFormat::Binary => writeln!(f, "header:         {}", self.name)?,
        }
        writeln!(f, "triangles:      {}", self.triangles)?;
        if let Some(declared) = self.declared {
            if u64::from(declared) != self.triangles {
                writeln!(f, "declared count: {declared}")?;
            }
        }
        writeln!(f, "max attributes: {} bytes", self.max_attributes)?;
        match self.bounds {
            Some((lo, hi)) => {
                writeln!(f, "bounds min:     {} {} {}", lo[0], lo[1], lo[2])?;
                writeln!(f, "bounds max:     {} {} {}", hi[0], hi[1], hi[2])
            }
            None => writeln!(f, "bounds:         empty"),
        }
    }
}
