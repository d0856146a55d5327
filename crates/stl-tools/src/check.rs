use std::fmt;
use std::path::Path;

use log::info;
use stl_core::validate::check;
use stl_core::{Callbacks, ErrorCode, Recovery, StlFormat};

use crate::ToolError;

/// Defect counts printed by `stltool check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Report {
    pub format: Option<StlFormat>,
    pub triangles: u64,
    pub degenerate: u64,
    pub mismatched: u64,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.degenerate == 0 && self.mismatched == 0
    }
}

/// Reads `path` keeping every triangle and classifies each one.
pub fn run(path: &Path) -> Result<Report, ToolError> {
    let mut report = Report::default();
    let summary = stl_io::read_file(
        path,
        Callbacks::new()
            .on_triangle(|t| {
                report.triangles += 1;
                match check(t) {
                    Ok(()) => {}
                    Err(ErrorCode::NotATriangle) => report.degenerate += 1,
                    Err(_) => report.mismatched += 1,
                }
                Ok(())
            })
            .on_error(|event| {
                info!("{} at {}", event.code, event.position);
                Recovery::Keep
            }),
    )?;
    report.format = Some(summary.format);
    Ok(report)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(format) = self.format {
            writeln!(f, "format:     {format}")?;
        }
        writeln!(f, "triangles:  {}", self.triangles)?;
        writeln!(f, "degenerate: {}", self.degenerate)?;
        writeln!(f, "mismatched: {}", self.mismatched)
    }
}
