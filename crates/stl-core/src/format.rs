//! STL variant identification.

use std::fmt;

/// Leading bytes that mark an ASCII STL file.
pub const ASCII_SIGNATURE: &[u8; 5] = b"solid";

/// The two STL encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StlFormat {
    Ascii,
    Binary,
}

impl StlFormat {
    /// Classifies a stream from its first bytes: `solid` means ASCII, anything
    /// else binary.
    ///
    /// This is a heuristic. The binary header is free-form, so a binary file
    /// whose header starts with `solid` is classified ASCII and then rejected
    /// by the ASCII parser at its first inconsistency.
    pub fn detect(prefix: &[u8]) -> Self {
        if prefix.starts_with(ASCII_SIGNATURE) {
            StlFormat::Ascii
        } else {
            StlFormat::Binary
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StlFormat::Ascii => "ascii",
            StlFormat::Binary => "binary",
        }
    }
}

impl fmt::Display for StlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_prefix_is_ascii_even_when_malformed() {
        assert_eq!(StlFormat::detect(b"solid \x00\x01garbage"), StlFormat::Ascii);
        assert_eq!(StlFormat::detect(b"solid"), StlFormat::Ascii);
    }

    #[test]
    fn anything_else_is_binary() {
        assert_eq!(StlFormat::detect(b"SOLID x"), StlFormat::Binary);
        assert_eq!(StlFormat::detect(b" solid"), StlFormat::Binary);
        assert_eq!(StlFormat::detect(b"soli"), StlFormat::Binary);
        assert_eq!(StlFormat::detect(&[0u8; 84]), StlFormat::Binary);
    }
}
