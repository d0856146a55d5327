//! Status codes and error handling for STL operations
//!
//! Control flow and failures share one vocabulary. Control signals that are not
//! failures ([`Status::Done`], [`Status::Continues`]) travel in the `Ok` arm of a
//! [`StlResult`]; everything else is an [`StlError`] carrying an [`ErrorCode`].
//! Error callbacks answer with a [`Recovery`] directive.

use std::fmt;
use std::io;

use thiserror::Error;

/// Non-failure outcome of a single codec step.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The step completed and the object accepts more input.
    Ok,
    /// The stream is complete; no further input is accepted.
    Done,
    /// The step is incomplete because the sink stalled. Call the continuation
    /// step again once the sink can accept more bytes.
    Continues,
}

impl Status {
    /// Returns true for [`Status::Done`].
    pub fn is_done(self) -> bool {
        self == Status::Done
    }

    /// Returns true for [`Status::Continues`].
    pub fn is_pending(self) -> bool {
        self == Status::Continues
    }
}

/// Failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A file or resource does not exist
    NotFound,
    /// Access to a file or resource was refused
    PermissionDenied,
    /// An allocation could not be satisfied
    OutOfMemory,
    /// Error when handling input or output stream
    Io,
    /// Invalid parameter passed to a function
    InvalidParameter,
    /// Operation not allowed in the current state
    InvalidState,
    /// Byte outside the ASCII STL character set
    InvalidCharacter,
    /// Input ended inside a header, record or statement
    UnexpectedEnd,
    /// ASCII token longer than the tokenizer accepts
    TokenTooLong,
    ExpectSolid,
    ExpectFacet,
    ExpectNormal,
    ExpectOuter,
    ExpectLoop,
    ExpectVertex,
    ExpectEndloop,
    ExpectEndfacet,
    ExpectFacetOrEndsolid,
    ExpectFloat,
    /// `endsolid` name differs from the `solid` name
    SolidNameMismatch,
    /// The three vertices are collinear or coincident
    NotATriangle,
    /// The declared normal disagrees with the vertex winding
    VertexNormalMismatch,
    /// ASCII STL cannot carry attribute bytes
    AttributesNotSupported,
    /// A callback stopped the stream
    Aborted,
}

impl ErrorCode {
    /// Returns the name of this error code as a string
    pub const fn name(self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::OutOfMemory => "OUT_OF_MEMORY",
            ErrorCode::Io => "IO_ERROR",
            ErrorCode::InvalidParameter => "INVALID_PARAMETER",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::InvalidCharacter => "INVALID_FORMAT_CHARACTER",
            ErrorCode::UnexpectedEnd => "INVALID_FORMAT_UNEXPECTED_END",
            ErrorCode::TokenTooLong => "INVALID_FORMAT_TOKEN_TOO_LONG",
            ErrorCode::ExpectSolid => "INVALID_FORMAT_EXPECT_SOLID",
            ErrorCode::ExpectFacet => "INVALID_FORMAT_EXPECT_FACET",
            ErrorCode::ExpectNormal => "INVALID_FORMAT_EXPECT_NORMAL",
            ErrorCode::ExpectOuter => "INVALID_FORMAT_EXPECT_OUTER",
            ErrorCode::ExpectLoop => "INVALID_FORMAT_EXPECT_LOOP",
            ErrorCode::ExpectVertex => "INVALID_FORMAT_EXPECT_VERTEX",
            ErrorCode::ExpectEndloop => "INVALID_FORMAT_EXPECT_ENDLOOP",
            ErrorCode::ExpectEndfacet => "INVALID_FORMAT_EXPECT_ENDFACET",
            ErrorCode::ExpectFacetOrEndsolid => "INVALID_FORMAT_EXPECT_FACET_OR_ENDSOLID",
            ErrorCode::ExpectFloat => "INVALID_FORMAT_EXPECT_FLOAT",
            ErrorCode::SolidNameMismatch => "INVALID_FORMAT_SOLID_NAME_MISMATCH",
            ErrorCode::NotATriangle => "INVALID_FORMAT_NOT_A_TRIANGLE",
            ErrorCode::VertexNormalMismatch => "INVALID_FORMAT_VERTEX_NORMAL_MISMATCH",
            ErrorCode::AttributesNotSupported => "INVALID_FORMAT_ATTRIBUTES_NOT_SUPPORTED",
            ErrorCode::Aborted => "ABORTED",
        }
    }

    /// Returns true for codes raised by the triangle validator.
    pub const fn is_geometric(self) -> bool {
        matches!(self, ErrorCode::NotATriangle | ErrorCode::VertexNormalMismatch)
    }

    /// Returns true for grammar and layout violations of the input.
    pub const fn is_format(self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidCharacter
                | ErrorCode::UnexpectedEnd
                | ErrorCode::TokenTooLong
                | ErrorCode::ExpectSolid
                | ErrorCode::ExpectFacet
                | ErrorCode::ExpectNormal
                | ErrorCode::ExpectOuter
                | ErrorCode::ExpectLoop
                | ErrorCode::ExpectVertex
                | ErrorCode::ExpectEndloop
                | ErrorCode::ExpectEndfacet
                | ErrorCode::ExpectFacetOrEndsolid
                | ErrorCode::ExpectFloat
                | ErrorCode::SolidNameMismatch
                | ErrorCode::NotATriangle
                | ErrorCode::VertexNormalMismatch
                | ErrorCode::AttributesNotSupported
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Directive returned by an error callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Recovery {
    /// Stop with the reported error. This is the answer when no callback is set.
    #[default]
    Abort,
    /// Drop the offending triangle and carry on with the next one.
    Skip,
    /// Accept the triangle as it is.
    Keep,
    /// Overwrite the declared normal with the one computed from the vertices.
    RepairNormal,
    /// Swap vertices 1 and 2 so the winding matches the declared normal.
    RepairOrder,
}

/// STL error type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{code} at {position}: {message}")]
pub struct StlError {
    code: ErrorCode,
    position: u64,
    message: String,
}

impl StlError {
    /// Creates a new StlError with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            position: 0,
            message: message.into(),
        }
    }

    /// Creates a new StlError with the given code only
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.name())
    }

    /// Attaches the line number (ASCII) or byte offset (binary) of the failure.
    pub fn at(mut self, position: u64) -> Self {
        self.position = position;
        self
    }

    /// Returns the error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the line number or byte offset where the error was detected
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParameter, message)
    }

    pub fn unexpected_end(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnexpectedEnd, message)
    }

    pub fn out_of_memory(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OutOfMemory, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Aborted, message)
    }
}

impl From<io::Error> for StlError {
    fn from(err: io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => ErrorCode::NotFound,
            io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            io::ErrorKind::OutOfMemory => ErrorCode::OutOfMemory,
            io::ErrorKind::InvalidInput => ErrorCode::InvalidParameter,
            _ => ErrorCode::Io,
        };
        Self::new(code, err.to_string())
    }
}

impl From<StlError> for io::Error {
    fn from(err: StlError) -> Self {
        let kind = match err.code() {
            ErrorCode::NotFound => io::ErrorKind::NotFound,
            ErrorCode::PermissionDenied => io::ErrorKind::PermissionDenied,
            ErrorCode::OutOfMemory => io::ErrorKind::OutOfMemory,
            ErrorCode::InvalidParameter => io::ErrorKind::InvalidInput,
            ErrorCode::Io => io::ErrorKind::Other,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

/// Result of a codec step.
pub type StlResult<T> = Result<T, StlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_kinds_map_to_codes() {
        let err: StlError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err: StlError = io::Error::new(io::ErrorKind::PermissionDenied, "no").into();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);

        let err: StlError = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert_eq!(err.code(), ErrorCode::Io);
    }

    #[test]
    fn display_includes_code_and_position() {
        let err = StlError::unexpected_end("record truncated").at(134);
        assert_eq!(
            err.to_string(),
            "INVALID_FORMAT_UNEXPECTED_END at 134: record truncated"
        );
    }

    #[test]
    fn geometric_codes_are_format_codes() {
        assert!(ErrorCode::NotATriangle.is_geometric());
        assert!(ErrorCode::NotATriangle.is_format());
        assert!(!ErrorCode::Io.is_format());
        assert_eq!(Recovery::default(), Recovery::Abort);
    }
}
