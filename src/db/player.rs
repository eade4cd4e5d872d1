//! The `.cbp` player directory: a 32-byte file header followed by
//! fixed-width records, keyed by the record index stored in the game
//! header. Bytes 0..30 hold the last name, 30..50 the first name, both
//! zero-padded latin-1.

use crate::notation::fixed_field;

pub const CBP_HEADER_SIZE: usize = 32;
pub const CBP_RECORD_SIZE: usize = 67;

const LAST_NAME: std::ops::Range<usize> = 0..30;
const FIRST_NAME: std::ops::Range<usize> = 30..50;

/// The player's name as PGN wants it: `"Last, First"`, falling back to
/// just the last name, or `"?"` when the record is empty or the index
/// points outside the file.
pub fn name(cbp: &[u8], index: usize) -> String {
    let start = CBP_HEADER_SIZE + index * CBP_RECORD_SIZE;
    let Some(rec) = cbp.get(start..start + CBP_RECORD_SIZE) else {
        return "?".to_string();
    };

    let last = fixed_field(&rec[LAST_NAME]);
    let first = fixed_field(&rec[FIRST_NAME]);
    match (last.is_empty(), first.is_empty()) {
        (true, true) => "?".to_string(),
        (false, true) => last,
        (true, false) => first,
        (false, false) => format!("{}, {}", last, first),
    }
}

/// Test-only builder for a `.cbp` file, shared with the end-to-end
/// tests.
#[cfg(test)]
pub fn build_file(players: &[(&str, &str)]) -> Vec<u8> {
    let mut res = vec![0u8; CBP_HEADER_SIZE];
    for (last, first) in players {
        let mut rec = [0u8; CBP_RECORD_SIZE];
        rec[..last.len()].copy_from_slice(last.as_bytes());
        rec[30..30 + first.len()].copy_from_slice(first.as_bytes());
        res.extend(rec);
    }
    res
}

#[test]
fn names_render_last_comma_first() {
    let file = build_file(&[("Kasparov", "Garry"), ("Anand", ""), ("", "")]);
    assert_eq!(name(&file, 0), "Kasparov, Garry");
    assert_eq!(name(&file, 1), "Anand");
    assert_eq!(name(&file, 2), "?");
    assert_eq!(name(&file, 3), "?", "index outside the file");
}
