//! Textual output: squares, FEN, SAN, and the PGN writer.

use std::fmt::Display;

use strum::VariantNames;

use crate::model::{BoardFile, BoardRank, Square};

pub mod fen;
pub mod pgn;
pub mod san;

impl Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::VARIANTS[self.ix()])
    }
}

impl Display for BoardFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl Display for BoardRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digit())
    }
}

/// Transcode the legacy single-byte text of the source files to UTF-8.
/// Every byte maps to the Unicode code point of the same value, which
/// covers the Latin-1 repertoire the databases use for names and
/// comments.
pub fn latin1_to_utf8(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Fixed-width directory fields are zero-padded; cut at the first NUL
/// and trim stray whitespace.
pub fn fixed_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    latin1_to_utf8(&bytes[..end]).trim().to_string()
}

#[test]
fn square_displays_in_algebraic() {
    assert_eq!(Square::e4.to_string(), "e4");
    assert_eq!(Square::a1.to_string(), "a1");
    assert_eq!(Square::h8.to_string(), "h8");
}

#[test]
fn latin1_transcodes_high_bytes() {
    assert_eq!(latin1_to_utf8(b"M\xfcller"), "Müller");
    assert_eq!(fixed_field(b"Kasparov\0\0\0\0"), "Kasparov");
}
