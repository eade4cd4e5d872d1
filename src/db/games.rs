//! The `.cbg` game-stream file: variable-length records located by the
//! header's game offset. Each record opens with a 4-byte big-endian
//! prologue word: bit 31 `not_initial`, bit 30 `not_encoded`, bit 29
//! `is_960`, bit 28 `special_encoding`, bits 0..23 the total record
//! length in bytes, prologue included.

pub const PROLOGUE_BYTES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamePrologue {
    pub not_initial: bool,
    pub not_encoded: bool,
    pub is_960: bool,
    pub special_encoding: bool,
    pub len: usize,
}

impl GamePrologue {
    pub fn parse(word: [u8; PROLOGUE_BYTES]) -> Self {
        let v = u32::from_be_bytes(word);
        Self {
            not_initial: v & 0x8000_0000 != 0,
            not_encoded: v & 0x4000_0000 != 0,
            is_960: v & 0x2000_0000 != 0,
            special_encoding: v & 0x1000_0000 != 0,
            len: (v & 0x00FF_FFFF) as usize,
        }
    }

    pub fn word(&self) -> [u8; PROLOGUE_BYTES] {
        let v = (self.not_initial as u32) << 31
            | (self.not_encoded as u32) << 30
            | (self.is_960 as u32) << 29
            | (self.special_encoding as u32) << 28
            | self.len as u32 & 0x00FF_FFFF;
        v.to_be_bytes()
    }
}

/// Read the prologue at `offset`; `None` when the offset or the declared
/// length leaves the file.
pub fn prologue_at(cbg: &[u8], offset: usize) -> Option<GamePrologue> {
    let word = cbg.get(offset..offset + PROLOGUE_BYTES)?;
    let p = GamePrologue::parse(word.try_into().ok()?);
    if p.len < PROLOGUE_BYTES || offset.checked_add(p.len)? > cbg.len() {
        return None;
    }
    Some(p)
}

/// The bytes of the record after the prologue (start position block
/// included when present).
pub fn record_body(cbg: &[u8], offset: usize, p: GamePrologue) -> &[u8] {
    &cbg[offset + PROLOGUE_BYTES..offset + p.len]
}

#[test]
fn prologue_round_trips() {
    let p = GamePrologue {
        not_initial: true,
        not_encoded: false,
        is_960: false,
        special_encoding: false,
        len: 0x123,
    };
    assert_eq!(GamePrologue::parse(p.word()), p);
}

#[test]
fn prologue_rejects_overlong_records() {
    let p = GamePrologue {
        not_initial: false,
        not_encoded: false,
        is_960: false,
        special_encoding: false,
        len: 100,
    };
    let mut file = p.word().to_vec();
    file.extend([0u8; 8]);
    assert_eq!(prologue_at(&file, 0), None, "length exceeds the file");

    file.extend([0u8; 100]);
    assert!(prologue_at(&file, 0).is_some());
}
