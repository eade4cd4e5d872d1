//! Byte cursor and the auxiliary payloads that ride along in the move
//! stream: comments and numeric annotation codes. These readers only
//! consume declared lengths; a length that overruns the slice is a
//! truncation, never a panic.

use crate::decode::DecodeError;
use crate::decode::opcodes::ANNOTATION_BYTES;
use crate::notation::latin1_to_utf8;

#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    #[inline]
    pub fn done(&self) -> bool {
        self.at >= self.bytes.len()
    }

    #[inline]
    pub fn at(&self) -> usize {
        self.at
    }

    pub fn take(&mut self) -> Result<u8, DecodeError> {
        let b = *self.bytes.get(self.at).ok_or(DecodeError::TruncatedStream)?;
        self.at += 1;
        Ok(b)
    }

    pub fn take_n(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.at.checked_add(n).ok_or(DecodeError::TruncatedStream)?;
        let slice = self
            .bytes
            .get(self.at..end)
            .ok_or(DecodeError::TruncatedStream)?;
        self.at = end;
        Ok(slice)
    }
}

/// Consume a comment payload: u16 big-endian length, then that many
/// latin-1 bytes.
pub fn read_comment(cur: &mut Cursor) -> Result<String, DecodeError> {
    let len = u16::from_be_bytes(cur.take_n(2)?.try_into().unwrap()) as usize;
    Ok(latin1_to_utf8(cur.take_n(len)?))
}

/// Consume the fixed annotation block and return the non-zero NAG codes.
pub fn read_annotations(cur: &mut Cursor) -> Result<Vec<u8>, DecodeError> {
    let block = cur.take_n(ANNOTATION_BYTES)?;
    Ok(block.iter().copied().filter(|&n| n != 0).collect())
}

#[test]
fn comment_roundtrip() {
    let mut bytes = vec![0x00, 0x08];
    bytes.extend(b"Sicilian");
    let mut cur = Cursor::new(&bytes);
    assert_eq!(read_comment(&mut cur).unwrap(), "Sicilian");
    assert!(cur.done());
}

#[test]
fn overlong_comment_is_truncation() {
    let bytes = vec![0xFF, 0xFF, b'x'];
    let mut cur = Cursor::new(&bytes);
    assert_eq!(read_comment(&mut cur), Err(DecodeError::TruncatedStream));
}

#[test]
fn annotation_block_filters_zeroes() {
    let bytes = vec![1, 0, 14];
    let mut cur = Cursor::new(&bytes);
    assert_eq!(read_annotations(&mut cur).unwrap(), vec![1, 14]);
}
