use std::path::PathBuf;

use clap::{Args, ValueEnum};
use log::debug;
use stl_core::callbacks::ErrorEvent;
use stl_core::validate::computed_normal;
use stl_core::vector::dot;
use stl_core::{
    AsciiWriterOptions, BinaryWriterOptions, Callbacks, ErrorCode, LineEnding, NormalMode,
    Recovery, StlFormat, StlWriter, Writer, WriterConfig,
};
use stl_io::{drive, FileSink};

use crate::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Ascii,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NormalsArg {
    /// Validate declared normals
    Check,
    /// Replace normals with the ones computed from the vertices
    Calculate,
    /// Copy normals without validation
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EolArg {
    Lf,
    Cr,
    Crlf,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    #[arg(name = "INPUT")]
    pub input: PathBuf,

    #[arg(name = "OUTPUT")]
    pub output: PathBuf,

    /// Output format (defaults to the input format)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// How the writer treats normals
    #[arg(long, value_enum, default_value = "check")]
    pub normals: NormalsArg,

    /// ASCII line ending (defaults to the platform convention)
    #[arg(long, value_enum)]
    pub eol: Option<EolArg>,

    /// ASCII solid name
    #[arg(long)]
    pub name: Option<String>,

    /// Significant digits of ASCII coordinates
    #[arg(long)]
    pub precision: Option<usize>,

    /// Fix mismatched normals and drop degenerate triangles instead of failing
    #[arg(long)]
    pub repair: bool,
}

impl ConvertArgs {
    fn config(&self, input_format: StlFormat) -> WriterConfig {
        let normal_mode = match self.normals {
            NormalsArg::Check => NormalMode::CheckNormals,
            NormalsArg::Calculate => NormalMode::CalculateNormals,
            NormalsArg::Copy => NormalMode::CopyNormals,
        };
        let format = match self.format {
            Some(FormatArg::Ascii) => StlFormat::Ascii,
            Some(FormatArg::Binary) => StlFormat::Binary,
            None => input_format,
        };
        match format {
            StlFormat::Binary => {
                WriterConfig::Binary(BinaryWriterOptions::new().with_normal_mode(normal_mode))
            }
            StlFormat::Ascii => {
                let mut opts = AsciiWriterOptions::new().with_normal_mode(normal_mode);
                if let Some(eol) = self.eol {
                    opts = opts.with_line_ending(match eol {
                        EolArg::Lf => LineEnding::Lf,
                        EolArg::Cr => LineEnding::Cr,
                        EolArg::Crlf => LineEnding::CrLf,
                    });
                }
                if let Some(name) = &self.name {
                    opts = opts.with_solid_name(name.clone());
                }
                if let Some(precision) = self.precision {
                    opts = opts.with_precision(precision);
                }
                WriterConfig::Ascii(opts)
            }
        }
    }
}

/// Directive for a validation failure during conversion.
///
/// Attribute bytes that ASCII output cannot carry are always dropped.
fn answer(event: &ErrorEvent<'_>, repair: bool) -> Recovery {
    match event.code {
        ErrorCode::AttributesNotSupported => Recovery::Keep,
        _ if !repair => Recovery::Abort,
        ErrorCode::NotATriangle => Recovery::Skip,
        ErrorCode::VertexNormalMismatch => {
            let flipped = event
                .triangle
                .and_then(|t| computed_normal(t).map(|n| dot(n, t.normal) < 0.0))
                .unwrap_or(false);
            if flipped {
                Recovery::RepairOrder
            } else {
                Recovery::RepairNormal
            }
        }
        _ => Recovery::Abort,
    }
}

/// Streams `args.input` into `args.output`, one triangle at a time.
pub fn run(args: &ConvertArgs) -> Result<u32, ToolError> {
    let input_format = stl_io::detect_file(&args.input)?;
    let config = args.config(input_format);
    debug!("converting {input_format} to {}", config.format());

    let repair = args.repair;
    let sink = FileSink::create(&args.output)?;
    let mut writer = StlWriter::new(sink, config)?.on_error(move |e| answer(e, repair));
    let status = writer.resume()?;
    drive(&mut writer, status)?;

    stl_io::read_file(
        &args.input,
        Callbacks::new()
            .on_triangle(|t| {
                let status = writer.write_triangle(t)?;
                drive(&mut writer, status)?;
                Ok(())
            })
            .on_error(move |e| answer(e, repair)),
    )?;

    let status = writer.finalize()?;
    drive(&mut writer, status)?;
    Ok(writer.triangles_written())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stl_core::Triangle;
    use stl_io::read_file_mem;

    fn args(input: PathBuf, output: PathBuf) -> ConvertArgs {
        ConvertArgs {
            input,
            output,
            format: None,
            normals: NormalsArg::Check,
            eol: None,
            name: None,
            precision: None,
            repair: false,
        }
    }

    fn samples() -> Vec<Triangle> {
        let v = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        vec![
            Triangle::new([0.0, 0.0, 1.0], v).with_attributes(vec![9, 9]),
            Triangle::new([0.0, 0.0, -1.0], v),
            Triangle::new([0.0, 1.0, 0.0], v),
            Triangle::new([0.0, 0.0, 1.0], [[0.0; 3], [1.0; 3], [2.0; 3]]),
        ]
    }

    #[test]
    fn binary_to_ascii_with_repair() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.stl");
        let output = dir.path().join("out.stl");
        let config = WriterConfig::default().with_normal_mode(NormalMode::CopyNormals);
        stl_io::write_file_mem(&input, samples(), config).unwrap();

        let mut convert = args(input.clone(), output.clone());
        assert!(run(&convert).is_err());

        convert.format = Some(FormatArg::Ascii);
        convert.eol = Some(EolArg::Lf);
        convert.name = Some("fixed".to_string());
        convert.repair = true;
        assert_eq!(run(&convert).unwrap(), 3);

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.starts_with("solid fixed\n"));
        let buffer = read_file_mem(&output).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.stride(), 104);
        let second = buffer.get(1).unwrap();
        assert_eq!(second.normal, [0.0, 0.0, -1.0]);
        assert_eq!(second.vertices[1], [0.0, 1.0, 0.0]);
        assert_eq!(buffer.get(2).unwrap().normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn calculate_mode_keeps_binary_format() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.stl");
        let output = dir.path().join("out.stl");
        let config = WriterConfig::default().with_normal_mode(NormalMode::CopyNormals);
        stl_io::write_file_mem(&input, &samples()[..3], config).unwrap();

        let mut convert = args(input, output.clone());
        convert.normals = NormalsArg::Calculate;
        convert.repair = true;
        assert_eq!(run(&convert).unwrap(), 3);
        assert_eq!(stl_io::detect_file(&output).unwrap(), StlFormat::Binary);
        let buffer = read_file_mem(&output).unwrap();
        assert_eq!(buffer.stride(), 104);
        assert!(buffer.iter().all(|t| stl_core::validate::check(&t).is_ok()));
        assert_eq!(buffer.get(2).unwrap().normal, [0.0, 0.0, 1.0]);
    }
}
