//! # Forsyth-Edwards Notation
//!
//! FEN is the standard single-line representation of a chess position:
//! the board written rank 8 down to rank 1 with empty squares run-length
//! encoded, then side to move, castling rights, en-passant square,
//! halfmove clock, and turn number. The converter only ever emits FEN,
//! for the `[FEN "…"]` header of games that start from a non-standard
//! position.

use std::fmt::Write;

use crate::model::{BoardFile, BoardRank, ChessColor, Square, mailbox::Position};

/// Render the position as a FEN string.
pub fn fen(pos: &Position) -> String {
    let mut res = String::new();

    for rank in (0..8u8).rev() {
        let mut empty = 0;
        for file in 0..8u8 {
            let sq = Square::from_coords(BoardFile::from_u8(file), BoardRank::from_u8(rank));
            match pos.board.get(sq) {
                Some(r) => {
                    if empty > 0 {
                        write!(res, "{}", empty).unwrap();
                        empty = 0;
                    }
                    res.push(r.man.fen_char());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            write!(res, "{}", empty).unwrap();
        }
        if rank > 0 {
            res.push('/');
        }
    }

    res.push(' ');
    res.push(match pos.to_move {
        ChessColor::WHITE => 'w',
        ChessColor::BLACK => 'b',
    });

    res.push(' ');
    let mut any = false;
    for (col, letters) in [(ChessColor::WHITE, ['K', 'Q']), (ChessColor::BLACK, ['k', 'q'])] {
        for (side, letter) in letters.iter().enumerate() {
            if pos.rights[col.ix()][side] {
                res.push(*letter);
                any = true;
            }
        }
    }
    if !any {
        res.push('-');
    }

    match pos.en_passant {
        Some(sq) => write!(res, " {}", sq).unwrap(),
        None => res.push_str(" -"),
    }

    write!(res, " {} {}", pos.halfmove_clock, pos.turn).unwrap();

    res
}

#[test]
fn startpos_fen() {
    assert_eq!(
        fen(&Position::startpos()),
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
}

#[test]
fn sparse_position_fen() {
    use crate::model::ChessMan;

    let mut pos = Position::empty();
    pos.place(Square::e1, ChessMan::WHITE_KING, 0).unwrap();
    pos.place(Square::e8, ChessMan::BLACK_KING, 0).unwrap();
    pos.place(Square::a2, ChessMan::WHITE_PAWN, 0).unwrap();
    pos.to_move = ChessColor::BLACK;
    pos.turn = 40;

    assert_eq!(fen(&pos), "4k3/8/8/8/8/8/P7/4K3 b - - 0 40");
}
