//! Writer configuration.

use crate::format::StlFormat;
use crate::triangle::BINARY_HEADER_SIZE;

/// Solid name written by the ASCII writer when the caller supplies none.
pub const DEFAULT_SOLID_NAME: &str = "mesh";

/// Significant digits of the ASCII writer's `%g` formatting.
pub const DEFAULT_PRECISION: usize = 6;

/// How writers treat the normal of each triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NormalMode {
    /// Validate; report mismatches to the error callback, never fix silently.
    #[default]
    CheckNormals,
    /// Always overwrite the normal with the one computed from the vertices.
    CalculateNormals,
    /// Write the normal exactly as supplied, no validation.
    CopyNormals,
}

/// End-of-line marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineEnding {
    Lf,
    Cr,
    CrLf,
}

impl LineEnding {
    /// LF on unix-like targets, CRLF elsewhere.
    pub const fn native() -> Self {
        if cfg!(windows) {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::Cr => b"\r",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

impl Default for LineEnding {
    fn default() -> Self {
        Self::native()
    }
}

/// Options for [`crate::BinaryWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryWriterOptions {
    pub normal_mode: NormalMode,
    pub header: [u8; BINARY_HEADER_SIZE],
}

impl Default for BinaryWriterOptions {
    fn default() -> Self {
        Self {
            normal_mode: NormalMode::default(),
            header: [0u8; BINARY_HEADER_SIZE],
        }
    }
}

impl BinaryWriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normal_mode(mut self, mode: NormalMode) -> Self {
        self.normal_mode = mode;
        self
    }

    /// Sets the free-form header. Longer input is truncated, shorter input is
    /// zero-padded to 80 bytes.
    pub fn with_header(mut self, header: &[u8]) -> Self {
        let len = header.len().min(BINARY_HEADER_SIZE);
        self.header = [0u8; BINARY_HEADER_SIZE];
        self.header[..len].copy_from_slice(&header[..len]);
        self
    }
}

/// Options for [`crate::AsciiWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiWriterOptions {
    pub normal_mode: NormalMode,
    pub line_ending: LineEnding,
    pub solid_name: String,
    pub precision: usize,
}

impl Default for AsciiWriterOptions {
    fn default() -> Self {
        Self {
            normal_mode: NormalMode::default(),
            line_ending: LineEnding::default(),
            solid_name: DEFAULT_SOLID_NAME.to_string(),
            precision: DEFAULT_PRECISION,
        }
    }
}

impl AsciiWriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normal_mode(mut self, mode: NormalMode) -> Self {
        self.normal_mode = mode;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn with_solid_name(mut self, name: impl Into<String>) -> Self {
        self.solid_name = name.into();
        self
    }

    /// Significant digits per number, clamped to 1..=17.
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision.clamp(1, 17);
        self
    }
}

/// Writer selection plus its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterConfig {
    Binary(BinaryWriterOptions),
    Ascii(AsciiWriterOptions),
}

impl WriterConfig {
    /// Default options for `format`.
    pub fn for_format(format: StlFormat) -> Self {
        match format {
            StlFormat::Binary => WriterConfig::Binary(BinaryWriterOptions::default()),
            StlFormat::Ascii => WriterConfig::Ascii(AsciiWriterOptions::default()),
        }
    }

    pub fn format(&self) -> StlFormat {
        match self {
            WriterConfig::Binary(_) => StlFormat::Binary,
            WriterConfig::Ascii(_) => StlFormat::Ascii,
        }
    }

    pub fn normal_mode(&self) -> NormalMode {
        match self {
            WriterConfig::Binary(opts) => opts.normal_mode,
            WriterConfig::Ascii(opts) => opts.normal_mode,
        }
    }

    pub fn with_normal_mode(self, mode: NormalMode) -> Self {
        match self {
            WriterConfig::Binary(opts) => WriterConfig::Binary(opts.with_normal_mode(mode)),
            WriterConfig::Ascii(opts) => WriterConfig::Ascii(opts.with_normal_mode(mode)),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig::Binary(BinaryWriterOptions::default())
    }
}

impl From<BinaryWriterOptions> for WriterConfig {
    fn from(opts: BinaryWriterOptions) -> Self {
        WriterConfig::Binary(opts)
    }
}

impl From<AsciiWriterOptions> for WriterConfig {
    fn from(opts: AsciiWriterOptions) -> Self {
        WriterConfig::Ascii(opts)
    }
}
