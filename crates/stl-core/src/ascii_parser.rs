//! Incremental ASCII STL decoder.
//!
//! A tokenizer splits the byte stream into words and end-of-line events; the
//! grammar consumes the words in the order
//!
//! ```text
//! solid <name>
//! ( facet normal nx ny nz
//!   outer loop
//!   vertex x y z  (three times)
//!   endloop
//!   endfacet )*
//! endsolid <name>
//! ```
//!
//! Keywords are case-sensitive. The line terminator (CR, LF or CRLF) is taken
//! from the first one seen; the other terminator byte is treated as a blank.

use log::{debug, trace};

use crate::callbacks::Callbacks;
use crate::error::{ErrorCode, Status, StlError, StlResult};
use crate::number::parse_float;
use crate::options::LineEnding;
use crate::parser::Parser;
use crate::triangle::Triangle;
use crate::validate::{self, Verdict};

/// Longest token (or solid name) the tokenizer buffers.
pub const MAX_TOKEN_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexer {
    SkipWhitespace,
    ReadToken,
    /// Collects the rest of the line, used for solid names.
    ReadToEol,
    SkipToEol,
}

/// Grammar position: the next word the parser expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsciiState {
    Solid,
    SolidName,
    Facet,
    Normal,
    /// Normal component 0..3.
    N(usize),
    Outer,
    Loop,
    /// `vertex` keyword of vertex 0..3.
    Vertex(usize),
    /// Vertex coordinate 0..9.
    V(usize),
    EndLoop,
    EndFacet,
    EndOrFacet,
    EndsolidName,
    Done,
    Error,
}

/// ASCII STL parser.
#[derive(Debug)]
pub struct AsciiParser<'a> {
    state: AsciiState,
    lexer: Lexer,
    callbacks: Callbacks<'a>,
    token: [u8; MAX_TOKEN_LEN],
    token_len: usize,
    name: Vec<u8>,
    terminator: Option<u8>,
    line_ending: Option<LineEnding>,
    last_byte: u8,
    line: u64,
    facet_line: u64,
    parsed: u64,
    triangle: Triangle,
    error: Option<ErrorCode>,
}

impl<'a> AsciiParser<'a> {
    pub fn new(callbacks: Callbacks<'a>) -> Self {
        Self {
            state: AsciiState::Solid,
            lexer: Lexer::SkipWhitespace,
            callbacks,
            token: [0u8; MAX_TOKEN_LEN],
            token_len: 0,
            name: Vec::new(),
            terminator: None,
            line_ending: None,
            last_byte: 0,
            line: 1,
            facet_line: 0,
            parsed: 0,
            triangle: Triangle::default(),
            error: None,
        }
    }

    pub fn state(&self) -> AsciiState {
        self.state
    }

    /// Current 1-based line number.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Line terminator detected so far.
    pub fn line_ending(&self) -> Option<LineEnding> {
        self.line_ending
    }

    /// Name from the `solid` line, empty if absent or not valid UTF-8.
    pub fn solid_name(&self) -> &str {
        std::str::from_utf8(&self.name).unwrap_or("")
    }

    pub fn error(&self) -> Option<ErrorCode> {
        self.error
    }

    fn token(&self) -> &[u8] {
        &self.token[..self.token_len]
    }

    fn fail_at(&self, code: ErrorCode) -> StlError {
        let shown = String::from_utf8_lossy(self.token());
        StlError::new(code, format!("unexpected token \"{shown}\"")).at(self.line)
    }

    fn push(&mut self, byte: u8) -> StlResult<()> {
        if self.token_len == MAX_TOKEN_LEN {
            return Err(StlError::new(
                ErrorCode::TokenTooLong,
                format!("token exceeds {MAX_TOKEN_LEN} bytes"),
            )
            .at(self.line));
        }
        self.token[self.token_len] = byte;
        self.token_len += 1;
        Ok(())
    }

    fn step(&mut self, byte: u8) -> StlResult<Status> {
        if !is_allowed(byte) {
            return Err(StlError::new(
                ErrorCode::InvalidCharacter,
                format!("byte 0x{byte:02x} is not allowed in ASCII STL"),
            )
            .at(self.line));
        }
        let previous = std::mem::replace(&mut self.last_byte, byte);

        let eol = match (byte, self.terminator) {
            (b'\r' | b'\n', None) => {
                self.terminator = Some(byte);
                self.line_ending = Some(if byte == b'\r' {
                    LineEnding::Cr
                } else {
                    LineEnding::Lf
                });
                debug!("ASCII STL line terminator {:?}", self.line_ending);
                true
            }
            (b'\n', Some(b'\r')) if previous == b'\r' => {
                if self.line_ending == Some(LineEnding::Cr) {
                    self.line_ending = Some(LineEnding::CrLf);
                }
                return Ok(Status::Ok);
            }
            (b'\r' | b'\n', Some(t)) => byte == t,
            _ => false,
        };
        let blank = !eol && matches!(byte, b' ' | b'\r' | b'\n');

        let status = match self.lexer {
            Lexer::SkipWhitespace => {
                if !eol && !blank {
                    self.token_len = 0;
                    self.push(byte)?;
                    self.lexer = Lexer::ReadToken;
                }
                Status::Ok
            }
            Lexer::ReadToken => {
                if eol || blank {
                    self.lexer = Lexer::SkipWhitespace;
                    self.token_done(eol)?
                } else {
                    self.push(byte)?;
                    Status::Ok
                }
            }
            Lexer::ReadToEol => {
                if eol {
                    self.lexer = Lexer::SkipWhitespace;
                    self.line_done()?
                } else {
                    if byte != b'\r' && byte != b'\n' {
                        self.push(byte)?;
                    }
                    Status::Ok
                }
            }
            Lexer::SkipToEol => {
                if eol {
                    self.lexer = Lexer::SkipWhitespace;
                    self.line_done()?
                } else {
                    Status::Ok
                }
            }
        };
        if eol {
            self.line += 1;
        }
        Ok(status)
    }

    /// Handles a complete word. `eol` is true when the word ended the line.
    fn token_done(&mut self, eol: bool) -> StlResult<Status> {
        match self.state {
            AsciiState::Solid => {
                if self.token() != b"solid" {
                    return Err(self.fail_at(ErrorCode::ExpectSolid));
                }
                if eol {
                    self.state = AsciiState::Facet;
                } else {
                    self.state = AsciiState::SolidName;
                    self.token_len = 0;
                    self.lexer = Lexer::ReadToEol;
                }
            }
            AsciiState::Facet | AsciiState::EndOrFacet => match self.token() {
                b"facet" => {
                    self.facet_line = self.line;
                    self.state = AsciiState::Normal;
                }
                b"endsolid" => {
                    if eol {
                        return self.complete();
                    }
                    self.state = AsciiState::EndsolidName;
                    self.token_len = 0;
                    self.lexer = if cfg!(feature = "solid-name-check") {
                        Lexer::ReadToEol
                    } else {
                        Lexer::SkipToEol
                    };
                }
                _ if self.state == AsciiState::Facet => {
                    return Err(self.fail_at(ErrorCode::ExpectFacet))
                }
                _ => return Err(self.fail_at(ErrorCode::ExpectFacetOrEndsolid)),
            },
            AsciiState::Normal => self.keyword(b"normal", ErrorCode::ExpectNormal, AsciiState::N(0))?,
            AsciiState::N(i) => {
                self.triangle.normal[i] = self.float()?;
                self.state = if i == 2 {
                    AsciiState::Outer
                } else {
                    AsciiState::N(i + 1)
                };
            }
            AsciiState::Outer => self.keyword(b"outer", ErrorCode::ExpectOuter, AsciiState::Loop)?,
            AsciiState::Loop => self.keyword(b"loop", ErrorCode::ExpectLoop, AsciiState::Vertex(0))?,
            AsciiState::Vertex(k) => {
                self.keyword(b"vertex", ErrorCode::ExpectVertex, AsciiState::V(k * 3))?
            }
            AsciiState::V(j) => {
                self.triangle.vertices[j / 3][j % 3] = self.float()?;
                self.state = match j {
                    8 => {
                        self.deliver()?;
                        AsciiState::EndLoop
                    }
                    2 | 5 => AsciiState::Vertex(j / 3 + 1),
                    _ => AsciiState::V(j + 1),
                };
            }
            AsciiState::EndLoop => {
                self.keyword(b"endloop", ErrorCode::ExpectEndloop, AsciiState::EndFacet)?
            }
            AsciiState::EndFacet => {
                self.keyword(b"endfacet", ErrorCode::ExpectEndfacet, AsciiState::EndOrFacet)?
            }
            AsciiState::SolidName
            | AsciiState::EndsolidName
            | AsciiState::Done
            | AsciiState::Error => {
                return Err(StlError::invalid_state(format!(
                    "token in grammar state {:?}",
                    self.state
                ))
                .at(self.line))
            }
        }
        Ok(Status::Ok)
    }

    /// Handles the end of a line read by `ReadToEol` or `SkipToEol`.
    fn line_done(&mut self) -> StlResult<Status> {
        match self.state {
            AsciiState::SolidName => {
                self.name = trim_blanks(self.token()).to_vec();
                debug!("ASCII STL solid \"{}\"", self.solid_name());
                self.state = AsciiState::Facet;
                Ok(Status::Ok)
            }
            AsciiState::EndsolidName => {
                if cfg!(feature = "solid-name-check") && trim_blanks(self.token()) != self.name {
                    return Err(StlError::new(
                        ErrorCode::SolidNameMismatch,
                        format!(
                            "endsolid \"{}\" does not close solid \"{}\"",
                            String::from_utf8_lossy(trim_blanks(self.token())),
                            self.solid_name()
                        ),
                    )
                    .at(self.line));
                }
                self.complete()
            }
            _ => Err(StlError::invalid_state(format!(
                "line end in grammar state {:?}",
                self.state
            ))
            .at(self.line)),
        }
    }

    fn keyword(&mut self, word: &[u8], code: ErrorCode, next: AsciiState) -> StlResult<()> {
        if self.token() != word {
            return Err(self.fail_at(code));
        }
        self.state = next;
        Ok(())
    }

    fn float(&self) -> StlResult<f64> {
        parse_float(self.token()).ok_or_else(|| self.fail_at(ErrorCode::ExpectFloat))
    }

    fn deliver(&mut self) -> StlResult<()> {
        let position = self.facet_line;
        let callbacks = &mut self.callbacks;
        let verdict = validate::validate(&mut self.triangle, position, &mut |event| {
            callbacks.error(event)
        })?;
        if verdict == Verdict::Accept {
            trace!("triangle {} at line {}", self.parsed, position);
            self.callbacks.triangle(&self.triangle)?;
        }
        self.parsed += 1;
        Ok(())
    }

    fn complete(&mut self) -> StlResult<Status> {
        debug!("ASCII STL complete after {} triangles", self.parsed);
        self.state = AsciiState::Done;
        self.callbacks.eof()?;
        Ok(Status::Done)
    }
}

impl Parser for AsciiParser<'_> {
    fn feed_byte(&mut self, byte: u8) -> StlResult<Status> {
        if self.is_terminal() {
            return Err(StlError::invalid_state("ASCII parser no longer accepts input").at(self.line));
        }
        self.step(byte).map_err(|err| {
            let err = if err.position() == 0 { err.at(self.line) } else { err };
            self.state = AsciiState::Error;
            self.error = Some(err.code());
            err
        })
    }

    /// Ends the input. A final line need not be terminated: LF and then CR
    /// are synthesized before giving up.
    fn finish(&mut self) -> StlResult<Status> {
        match self.state {
            AsciiState::Done => return Ok(Status::Done),
            AsciiState::Error => {
                return Err(StlError::invalid_state("ASCII parser already failed").at(self.line))
            }
            _ => {}
        }
        for byte in [b'\n', b'\r'] {
            if self.feed_byte(byte)? == Status::Done {
                return Ok(Status::Done);
            }
        }
        let err = StlError::unexpected_end(format!(
            "input ended in grammar state {:?} after {} triangles",
            self.state, self.parsed
        ))
        .at(self.line);
        self.state = AsciiState::Error;
        self.error = Some(err.code());
        Err(err)
    }

    fn triangles_parsed(&self) -> u64 {
        self.parsed
    }

    fn position(&self) -> u64 {
        self.line
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, AsciiState::Done | AsciiState::Error)
    }
}

fn is_allowed(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'+' | b'_' | b' ' | b'\r' | b'\n')
}

fn trim_blanks(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(start, |i| i + 1);
    &bytes[start..end]
}
