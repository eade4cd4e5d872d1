//! Decoding the 28-byte start-position block of games that do not begin
//! from the standard position.
//!
//! Layout:
//!
//! - byte 0: flags, with bit 0 the side to move (set = black) and bits
//!   1..4 the castling rights in the order WK, WQ, BK, BQ
//! - byte 1: en-passant file, `0xFF` for none
//! - byte 2: halfmove clock
//! - byte 3: fullmove number
//! - bytes 4..27: the board as an MSB-first bit stream, squares scanned
//!   file a..h and rank 1..8 within each file: a `0` bit is an empty
//!   square, a `1` bit is followed by a 4-bit man code (`0x1..0x6` white
//!   king, queen, rook, bishop, knight, pawn; `0x9..0xE` the same for
//!   black)
//!
//! Catalog slots are handed out in scan order, lowest free slot per
//! bucket, so the producer and this decoder agree on which slot every
//! man occupies.

use crate::decode::DecodeError;
use crate::model::mailbox::Position;
use crate::model::{BoardFile, BoardRank, ChessColor, ChessEchelon, ChessMan, Square};
use crate::notation::fen::fen;

pub const SETUP_BYTES: usize = 28;

/// Man codes in block order: king first, pawn last.
const CODE_ECHELON: [ChessEchelon; 6] = [
    ChessEchelon::KING,
    ChessEchelon::QUEEN,
    ChessEchelon::ROOK,
    ChessEchelon::BISHOP,
    ChessEchelon::KNIGHT,
    ChessEchelon::PAWN,
];

struct BitReader<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn bit(&mut self) -> Result<u8, DecodeError> {
        let byte = self
            .bytes
            .get(self.at / 8)
            .ok_or_else(|| DecodeError::InvalidStartPosition("board bits exhausted".into()))?;
        let bit = (byte >> (7 - self.at % 8)) & 1;
        self.at += 1;
        Ok(bit)
    }

    fn bits(&mut self, n: usize) -> Result<u8, DecodeError> {
        let mut res = 0;
        for _ in 0..n {
            res = res << 1 | self.bit()?;
        }
        Ok(res)
    }
}

fn man_from_code(code: u8) -> Result<ChessMan, DecodeError> {
    let col = if code & 0x8 != 0 {
        ChessColor::BLACK
    } else {
        ChessColor::WHITE
    };
    let kind = code & 0x7;
    if !(1..=6).contains(&kind) {
        return Err(DecodeError::InvalidStartPosition(format!(
            "bad man code 0x{:x}",
            code
        )));
    }
    Ok(ChessMan::of(col, CODE_ECHELON[kind as usize - 1]))
}

/// Decode the block into a fresh position plus the FEN string carried
/// into the PGN headers.
pub fn decode_start_position(block: &[u8]) -> Result<(Position, String), DecodeError> {
    if block.len() < SETUP_BYTES {
        return Err(DecodeError::InvalidStartPosition(format!(
            "block is {} bytes, need {}",
            block.len(),
            SETUP_BYTES
        )));
    }

    let flags = block[0];
    let mut pos = Position::empty();
    pos.to_move = if flags & 1 != 0 {
        ChessColor::BLACK
    } else {
        ChessColor::WHITE
    };
    pos.rights = [
        [flags & 0b0010 != 0, flags & 0b0100 != 0],
        [flags & 0b1000 != 0, flags & 0b1_0000 != 0],
    ];
    pos.halfmove_clock = block[2];
    pos.turn = block[3].max(1) as u16;

    let mut bits = BitReader::new(&block[4..SETUP_BYTES]);
    let mut kings = [0u8; 2];

    for file in 0..8u8 {
        for rank in 0..8u8 {
            if bits.bit()? == 0 {
                continue;
            }
            let man = man_from_code(bits.bits(4)?)?;
            let sq = Square::from_coords(BoardFile::from_u8(file), BoardRank::from_u8(rank));

            if man.ech() == ChessEchelon::PAWN && (rank == 0 || rank == 7) {
                return Err(DecodeError::InvalidStartPosition(format!(
                    "pawn on {}",
                    sq
                )));
            }
            if man.ech() == ChessEchelon::KING {
                kings[man.col().ix()] += 1;
                if kings[man.col().ix()] > 1 {
                    return Err(DecodeError::InvalidStartPosition(format!(
                        "two {} kings",
                        ["white", "black"][man.col().ix()]
                    )));
                }
            }

            let slot = pos
                .catalog
                .lowest_free(man.col(), man.ech())
                .ok_or_else(|| {
                    DecodeError::InvalidStartPosition(format!(
                        "too many {}s",
                        man.ech().name()
                    ))
                })?;
            pos.place(sq, man, slot)
                .map_err(|f| DecodeError::InvalidStartPosition(f.to_string()))?;
        }
    }

    for col in [ChessColor::WHITE, ChessColor::BLACK] {
        if kings[col.ix()] == 0 {
            return Err(DecodeError::InvalidStartPosition(format!(
                "no {} king",
                ["white", "black"][col.ix()]
            )));
        }
    }

    if block[1] != 0xFF {
        let file = BoardFile::from_u8(block[1]);
        let rank = match pos.to_move {
            ChessColor::WHITE => BoardRank::r6,
            ChessColor::BLACK => BoardRank::r3,
        };
        pos.en_passant = Some(Square::from_coords(file, rank));
    }

    let fen = fen(&pos);
    Ok((pos, fen))
}

/// Test-only encoder for the block, shared with the end-to-end tests.
#[cfg(test)]
pub mod enc {
    use super::*;

    pub struct Setup {
        pub men: Vec<(Square, ChessMan)>,
        pub black_to_move: bool,
        pub rights: [[bool; 2]; 2],
        pub ep_file: Option<u8>,
        pub halfmove: u8,
        pub turn: u8,
    }

    impl Setup {
        pub fn new(men: Vec<(Square, ChessMan)>) -> Self {
            Self {
                men,
                black_to_move: false,
                rights: [[false; 2]; 2],
                ep_file: None,
                halfmove: 0,
                turn: 1,
            }
        }

        pub fn block(&self) -> [u8; SETUP_BYTES] {
            let mut res = [0u8; SETUP_BYTES];
            res[0] = self.black_to_move as u8
                | (self.rights[0][0] as u8) << 1
                | (self.rights[0][1] as u8) << 2
                | (self.rights[1][0] as u8) << 3
                | (self.rights[1][1] as u8) << 4;
            res[1] = self.ep_file.unwrap_or(0xFF);
            res[2] = self.halfmove;
            res[3] = self.turn;

            let mut at = 0;
            let mut push = |bits: &mut [u8], val: u8, n: usize| {
                for i in (0..n).rev() {
                    if val >> i & 1 != 0 {
                        bits[at / 8] |= 0x80 >> (at % 8);
                    }
                    at += 1;
                }
            };

            for file in 0..8u8 {
                for rank in 0..8u8 {
                    let sq =
                        Square::from_coords(BoardFile::from_u8(file), BoardRank::from_u8(rank));
                    match self.men.iter().find(|(s, _)| *s == sq) {
                        Some((_, man)) => {
                            let code = (man.col().ix() as u8) << 3
                                | CODE_ECHELON.iter().position(|e| *e == man.ech()).unwrap()
                                    as u8
                                + 1;
                            push(&mut res[4..], 1, 1);
                            push(&mut res[4..], code, 4);
                        }
                        None => push(&mut res[4..], 0, 1),
                    }
                }
            }

            res
        }
    }
}

#[test]
fn standard_position_block_matches_startpos() {
    use strum::VariantArray;

    let std = Position::startpos();
    let mut men = vec![];
    for ix in 0..64u8 {
        let sq = Square::from_u8(ix);
        if let Some(r) = std.board.get(sq) {
            men.push((sq, r.man));
        }
    }
    let mut setup = enc::Setup::new(men);
    setup.rights = [[true; 2]; 2];

    let (pos, fen_str) = decode_start_position(&setup.block()).unwrap();
    pos.sanity_check();
    assert_eq!(
        fen_str,
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );

    // scan order reproduces the standard slot assignment
    for man in ChessMan::VARIANTS {
        for slot in 0..8 {
            assert_eq!(pos.lookup(*man, slot), std.lookup(*man, slot));
        }
    }
}

#[test]
fn endgame_block_round_trips_to_fen() {
    use ChessMan::*;

    let mut setup = enc::Setup::new(vec![
        (Square::b6, WHITE_KING),
        (Square::b4, WHITE_PAWN),
        (Square::d5, BLACK_KING),
    ]);
    setup.black_to_move = true;
    setup.turn = 60;

    let (pos, fen_str) = decode_start_position(&setup.block()).unwrap();
    assert_eq!(fen_str, "8/8/1K6/3k4/1P6/8/8/8 b - - 0 60");
    assert_eq!(pos.lookup(WHITE_PAWN, 0), Some(Square::b4));
}

#[test]
fn rejects_bad_positions() {
    use ChessMan::*;

    let two_kings = enc::Setup::new(vec![
        (Square::a1, WHITE_KING),
        (Square::h1, WHITE_KING),
        (Square::e8, BLACK_KING),
    ]);
    assert!(matches!(
        decode_start_position(&two_kings.block()),
        Err(DecodeError::InvalidStartPosition(_))
    ));

    let pawn_on_last = enc::Setup::new(vec![
        (Square::a1, WHITE_KING),
        (Square::e8, BLACK_KING),
        (Square::c8, WHITE_PAWN),
    ]);
    assert!(matches!(
        decode_start_position(&pawn_on_last.block()),
        Err(DecodeError::InvalidStartPosition(_))
    ));

    let no_black_king = enc::Setup::new(vec![(Square::a1, WHITE_KING)]);
    assert!(matches!(
        decode_start_position(&no_black_king.block()),
        Err(DecodeError::InvalidStartPosition(_))
    ));
}
