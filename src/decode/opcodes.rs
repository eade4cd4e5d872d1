//! # The move-stream opcode table.
//!
//! Every byte of a game's move stream falls into exactly one of three
//! classes: a single-byte move of one of the named piece slots, a marker
//! that introduces a multi-byte payload or structural event, or an
//! illegal value. The partition:
//!
//! | bytes         | meaning                                           |
//! |---------------|---------------------------------------------------|
//! | `0x00`        | end of game                                       |
//! | `0x01..=0x08` | king, one step, 8 compass directions              |
//! | `0x09`        | castle kingside                                   |
//! | `0x0A`        | castle queenside                                  |
//! | `0x0B..=0x26` | queen #0: 7 rank + 7 file + 7 diagonal + 7 anti   |
//! | `0x27..=0x34` | rook #0: 7 rank + 7 file                          |
//! | `0x35..=0x42` | rook #1                                           |
//! | `0x43..=0x50` | bishop #0: 7 diagonal + 7 anti-diagonal           |
//! | `0x51..=0x5E` | bishop #1                                         |
//! | `0x5F..=0x66` | knight #0: 8 literal offsets                      |
//! | `0x67..=0x6E` | knight #1                                         |
//! | `0x6F..=0x8E` | pawns #0..#7, 4 codes each: push, double push,    |
//! |               | capture kingside, capture queenside               |
//! | `0x8F`        | null move, followed by one zero trailer byte      |
//! | `0x90`        | variation push                                    |
//! | `0x91`        | variation pop                                     |
//! | `0x92`        | comment: u16 big-endian length + latin-1 bytes    |
//! | `0x93`        | annotation: three NAG bytes, zero = unused        |
//! | `0x94..=0xFF` | illegal                                           |
//!
//! Displacements are stored from white's perspective; the decoder negates
//! both components when black is to move. Sliding pieces and pawns resolve
//! their destination with mod-8 wrap on both coordinates (that is how
//! seven codes per line cover both directions of travel). King and knight
//! offsets are literal, and walking off the board is a desync.

use std::sync::LazyLock;

use crate::model::ChessEchelon;
use crate::model::mailbox::CastleSide;

pub const END_OF_GAME: u8 = 0x00;
pub const KING_BASE: u8 = 0x01;
pub const CASTLE_KINGSIDE: u8 = 0x09;
pub const CASTLE_QUEENSIDE: u8 = 0x0A;
pub const QUEEN_BASE: u8 = 0x0B;
pub const ROOK_BASE: [u8; 2] = [0x27, 0x35];
pub const BISHOP_BASE: [u8; 2] = [0x43, 0x51];
pub const KNIGHT_BASE: [u8; 2] = [0x5F, 0x67];
pub const PAWN_BASE: u8 = 0x6F;
pub const NULL_MOVE: u8 = 0x8F;
pub const PUSH_VARIATION: u8 = 0x90;
pub const POP_VARIATION: u8 = 0x91;
pub const COMMENT: u8 = 0x92;
pub const ANNOTATION: u8 = 0x93;

/// Length of the NAG block behind an [`ANNOTATION`] marker.
pub const ANNOTATION_BYTES: usize = 3;

pub const KING_STEPS: [(i8, i8); 8] = [
    (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1),
];

pub const KNIGHT_STEPS: [(i8, i8); 8] = [
    (2, 1), (1, 2), (-1, 2), (-2, 1), (-2, -1), (-1, -2), (1, -2), (2, -1),
];

/// Pawn codes in table order: push one, push two, capture toward the
/// kingside, capture toward the queenside.
pub const PAWN_STEPS: [(i8, i8); 4] = [(0, 1), (0, 2), (1, 1), (-1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Move the man in (echelon, slot) by the white-perspective displacement.
    Move {
        ech: ChessEchelon,
        slot: u8,
        dx: i8,
        dy: i8,
    },
    Castle(CastleSide),
    NullMove,
    PushVariation,
    PopVariation,
    Comment,
    Annotation,
    EndOfGame,
    Illegal,
}

/// The promotion byte trailing a pawn move that reaches the last rank.
pub fn promotion_echelon(byte: u8) -> Option<ChessEchelon> {
    match byte {
        0 => Some(ChessEchelon::QUEEN),
        1 => Some(ChessEchelon::ROOK),
        2 => Some(ChessEchelon::BISHOP),
        3 => Some(ChessEchelon::KNIGHT),
        _ => None,
    }
}

/// Slider displacements in table order for a line piece: 7 along-rank and
/// 7 along-file codes for rooks, 7 diagonal and 7 anti-diagonal codes for
/// bishops, all four groups for the queen.
fn line_steps(ech: ChessEchelon) -> Vec<(i8, i8)> {
    let mut res = vec![];
    if matches!(ech, ChessEchelon::QUEEN | ChessEchelon::ROOK) {
        res.extend((1..8).map(|d| (d, 0)));
        res.extend((1..8).map(|d| (0, d)));
    }
    if matches!(ech, ChessEchelon::QUEEN | ChessEchelon::BISHOP) {
        res.extend((1..8).map(|d| (d, d)));
        res.extend((1..8).map(|d| (d, -d)));
    }
    res
}

fn build_table() -> [OpCode; 256] {
    use ChessEchelon::*;

    let mut table = [OpCode::Illegal; 256];

    let mut fill = |base: u8, ech: ChessEchelon, slot: u8, steps: &[(i8, i8)]| {
        for (ix, (dx, dy)) in steps.iter().enumerate() {
            table[base as usize + ix] = OpCode::Move {
                ech,
                slot,
                dx: *dx,
                dy: *dy,
            };
        }
    };

    fill(KING_BASE, KING, 0, &KING_STEPS);
    fill(QUEEN_BASE, QUEEN, 0, &line_steps(QUEEN));
    for slot in 0..2u8 {
        fill(ROOK_BASE[slot as usize], ROOK, slot, &line_steps(ROOK));
        fill(BISHOP_BASE[slot as usize], BISHOP, slot, &line_steps(BISHOP));
        fill(KNIGHT_BASE[slot as usize], KNIGHT, slot, &KNIGHT_STEPS);
    }
    for slot in 0..8u8 {
        fill(PAWN_BASE + slot * 4, PAWN, slot, &PAWN_STEPS);
    }

    table[END_OF_GAME as usize] = OpCode::EndOfGame;
    table[CASTLE_KINGSIDE as usize] = OpCode::Castle(CastleSide::KINGSIDE);
    table[CASTLE_QUEENSIDE as usize] = OpCode::Castle(CastleSide::QUEENSIDE);
    table[NULL_MOVE as usize] = OpCode::NullMove;
    table[PUSH_VARIATION as usize] = OpCode::PushVariation;
    table[POP_VARIATION as usize] = OpCode::PopVariation;
    table[COMMENT as usize] = OpCode::Comment;
    table[ANNOTATION as usize] = OpCode::Annotation;

    table
}

pub static OPCODES: LazyLock<[OpCode; 256]> = LazyLock::new(build_table);

#[inline]
pub fn classify(byte: u8) -> OpCode {
    OPCODES[byte as usize]
}

/// Test-only inverse of the table, so tests can spell out streams without
/// hand-computing byte values.
#[cfg(test)]
pub mod enc {
    use super::*;

    fn step_index(steps: &[(i8, i8)], dx: i8, dy: i8) -> u8 {
        steps
            .iter()
            .position(|s| *s == (dx, dy))
            .expect("displacement not in table") as u8
    }

    pub fn king(dx: i8, dy: i8) -> u8 {
        KING_BASE + step_index(&KING_STEPS, dx, dy)
    }

    pub fn queen(dx: i8, dy: i8) -> u8 {
        QUEEN_BASE + step_index(&line_steps(ChessEchelon::QUEEN), dx, dy)
    }

    pub fn rook(slot: u8, dx: i8, dy: i8) -> u8 {
        ROOK_BASE[slot as usize] + step_index(&line_steps(ChessEchelon::ROOK), dx, dy)
    }

    pub fn bishop(slot: u8, dx: i8, dy: i8) -> u8 {
        BISHOP_BASE[slot as usize] + step_index(&line_steps(ChessEchelon::BISHOP), dx, dy)
    }

    pub fn knight(slot: u8, dx: i8, dy: i8) -> u8 {
        KNIGHT_BASE[slot as usize] + step_index(&KNIGHT_STEPS, dx, dy)
    }

    pub fn pawn(slot: u8, dx: i8, dy: i8) -> u8 {
        PAWN_BASE + slot * 4 + step_index(&PAWN_STEPS, dx, dy)
    }

    pub fn comment(text: &str) -> Vec<u8> {
        let mut res = vec![COMMENT];
        res.extend((text.len() as u16).to_be_bytes());
        res.extend(text.bytes());
        res
    }

    pub fn annotation(nags: [u8; ANNOTATION_BYTES]) -> Vec<u8> {
        let mut res = vec![ANNOTATION];
        res.extend(nags);
        res
    }
}

#[test]
fn partition_covers_expected_ranges() {
    // spot checks pinning the documented byte layout
    assert_eq!(classify(0x00), OpCode::EndOfGame);
    assert_eq!(
        classify(0x01),
        OpCode::Move { ech: ChessEchelon::KING, slot: 0, dx: 1, dy: 0 }
    );
    assert_eq!(classify(0x09), OpCode::Castle(CastleSide::KINGSIDE));
    assert_eq!(
        classify(0x0B),
        OpCode::Move { ech: ChessEchelon::QUEEN, slot: 0, dx: 1, dy: 0 }
    );
    assert_eq!(
        classify(0x26),
        OpCode::Move { ech: ChessEchelon::QUEEN, slot: 0, dx: 7, dy: -7 }
    );
    assert_eq!(
        classify(0x35),
        OpCode::Move { ech: ChessEchelon::ROOK, slot: 1, dx: 1, dy: 0 }
    );
    assert_eq!(
        classify(0x5F),
        OpCode::Move { ech: ChessEchelon::KNIGHT, slot: 0, dx: 2, dy: 1 }
    );
    // e-pawn double push is pawn slot 4, second code of its block
    assert_eq!(
        classify(PAWN_BASE + 4 * 4 + 1),
        OpCode::Move { ech: ChessEchelon::PAWN, slot: 4, dx: 0, dy: 2 }
    );
    assert_eq!(classify(0x8E), OpCode::Move {
        ech: ChessEchelon::PAWN,
        slot: 7,
        dx: -1,
        dy: 1
    });
    assert_eq!(classify(0x94), OpCode::Illegal);
    assert_eq!(classify(0xFF), OpCode::Illegal);
}

#[test]
fn every_byte_classified_once() {
    let mut moves = 0;
    let mut markers = 0;
    let mut illegal = 0;
    for b in 0..=255u8 {
        match classify(b) {
            OpCode::Move { .. } | OpCode::Castle(_) => moves += 1,
            OpCode::Illegal => illegal += 1,
            _ => markers += 1,
        }
    }
    // 8 king + 2 castle + 28 queen + 2*14 rook + 2*14 bishop + 2*8 knight + 32 pawn
    assert_eq!(moves, 142);
    assert_eq!(markers, 6);
    assert_eq!(illegal, 256 - 142 - 6);
}
