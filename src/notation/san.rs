//! Standard algebraic notation, rendered against the position a move was
//! played from.
//!
//! Disambiguation follows the usual ladder: nothing, then originating
//! file, then rank, then both. A rival is any same-colored man of the
//! same echelon that could also travel to the destination over the
//! pre-move occupancy. Check and mate suffixes are not produced. That
//! would take legality analysis, which the decoder deliberately does not
//! do.

use crate::model::{
    ChessEchelon, DecodedMove, MoveKind, Square,
    mailbox::{BUCKET_SLOTS, Position},
};

/// Render one decoded move as a SAN token.
pub fn render(pre: &Position, mv: &DecodedMove) -> String {
    match mv.kind {
        MoveKind::Null => "--".to_string(),
        MoveKind::CastleKingside => "O-O".to_string(),
        MoveKind::CastleQueenside => "O-O-O".to_string(),
        _ if mv.man.ech() == ChessEchelon::PAWN => pawn_token(mv),
        _ => officer_token(pre, mv),
    }
}

fn pawn_token(mv: &DecodedMove) -> String {
    let mut res = String::new();
    if mv.is_capture() {
        res.push(mv.from.file().letter());
        res.push('x');
    }
    res.push_str(&mv.to.to_string());
    if let MoveKind::Promotion(ech) = mv.kind {
        res.push('=');
        res.push_str(ech.san_letter());
    }
    res
}

fn officer_token(pre: &Position, mv: &DecodedMove) -> String {
    let ech = mv.man.ech();
    let mut res = ech.san_letter().to_string();
    res.push_str(&disambiguator(pre, mv));
    if mv.is_capture() {
        res.push('x');
    }
    res.push_str(&mv.to.to_string());
    res
}

fn disambiguator(pre: &Position, mv: &DecodedMove) -> String {
    let ech = mv.man.ech();
    if ech == ChessEchelon::KING {
        return String::new();
    }

    let bucket = pre.catalog.bucket(mv.man.col(), ech);
    let mut rivals: Vec<Square> = vec![];
    for slot in 0..BUCKET_SLOTS {
        let Some(sq) = bucket[slot] else { continue };
        if sq != mv.from && reaches(pre, sq, mv.to, ech) {
            rivals.push(sq);
        }
    }

    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        mv.from.file().to_string()
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        mv.from.rank().to_string()
    } else {
        format!("{}{}", mv.from.file(), mv.from.rank())
    }
}

/// Whether a man of `ech` standing on `from` could travel to `to` over
/// the current occupancy. Pure geometry plus blocking; no king-safety.
fn reaches(pre: &Position, from: Square, to: Square, ech: ChessEchelon) -> bool {
    let dx = to.file().ix() as i8 - from.file().ix() as i8;
    let dy = to.rank().ix() as i8 - from.rank().ix() as i8;

    match ech {
        ChessEchelon::KNIGHT => (dx.abs() == 2 && dy.abs() == 1) || (dx.abs() == 1 && dy.abs() == 2),
        ChessEchelon::KING => dx.abs() <= 1 && dy.abs() <= 1 && (dx, dy) != (0, 0),
        ChessEchelon::ROOK => (dx == 0) != (dy == 0) && line_clear(pre, from, to, dx, dy),
        ChessEchelon::BISHOP => dx.abs() == dy.abs() && dx != 0 && line_clear(pre, from, to, dx, dy),
        ChessEchelon::QUEEN => {
            ((dx == 0) != (dy == 0) || (dx.abs() == dy.abs() && dx != 0))
                && line_clear(pre, from, to, dx, dy)
        }
        ChessEchelon::PAWN => false,
    }
}

fn line_clear(pre: &Position, from: Square, to: Square, dx: i8, dy: i8) -> bool {
    let sx = dx.signum();
    let sy = dy.signum();
    let mut sq = from;
    loop {
        sq = match sq.offset(sx, sy) {
            Some(next) => next,
            None => return false,
        };
        if sq == to {
            return true;
        }
        if pre.board.get(sq).is_some() {
            return false;
        }
    }
}

#[cfg(test)]
fn mv(
    pre: &Position,
    man: crate::model::ChessMan,
    from: Square,
    to: Square,
    kind: MoveKind,
) -> DecodedMove {
    DecodedMove {
        from,
        to,
        man,
        capture: pre.board.get(to).map(|r| r.man),
        kind,
    }
}

#[test]
fn plain_officer_moves() {
    use crate::model::ChessMan;

    let pos = Position::startpos();
    let nf3 = mv(&pos, ChessMan::WHITE_KNIGHT, Square::g1, Square::f3, MoveKind::Simple);
    assert_eq!(render(&pos, &nf3), "Nf3");
}

#[test]
fn pawn_capture_and_promotion() {
    use crate::model::ChessMan;

    let mut pos = Position::empty();
    pos.place(Square::b2, ChessMan::BLACK_PAWN, 1).unwrap();
    pos.place(Square::c1, ChessMan::WHITE_BISHOP, 0).unwrap();

    let bxc1 = DecodedMove {
        from: Square::b2,
        to: Square::c1,
        man: ChessMan::BLACK_PAWN,
        capture: Some(ChessMan::WHITE_BISHOP),
        kind: MoveKind::Promotion(ChessEchelon::QUEEN),
    };
    assert_eq!(render(&pos, &bxc1), "bxc1=Q");
}

#[test]
fn rook_disambiguation_by_file() {
    use crate::model::ChessMan;

    let mut pos = Position::empty();
    pos.place(Square::a1, ChessMan::WHITE_ROOK, 0).unwrap();
    pos.place(Square::h1, ChessMan::WHITE_ROOK, 1).unwrap();

    let rad1 = mv(&pos, ChessMan::WHITE_ROOK, Square::a1, Square::d1, MoveKind::Simple);
    assert_eq!(render(&pos, &rad1), "Rad1");
}

#[test]
fn blocked_rival_needs_no_disambiguation() {
    use crate::model::ChessMan;

    let mut pos = Position::empty();
    pos.place(Square::a1, ChessMan::WHITE_ROOK, 0).unwrap();
    pos.place(Square::h1, ChessMan::WHITE_ROOK, 1).unwrap();
    pos.place(Square::e1, ChessMan::WHITE_KING, 0).unwrap();

    // the king on e1 blocks the h1 rook's path to d1
    let rd1 = mv(&pos, ChessMan::WHITE_ROOK, Square::a1, Square::d1, MoveKind::Simple);
    assert_eq!(render(&pos, &rd1), "Rd1");
}

#[test]
fn full_square_disambiguation() {
    use crate::model::ChessMan;

    let mut pos = Position::empty();
    pos.place(Square::a1, ChessMan::WHITE_QUEEN, 0).unwrap();
    pos.place(Square::a5, ChessMan::WHITE_QUEEN, 1).unwrap();
    pos.place(Square::e1, ChessMan::WHITE_QUEEN, 2).unwrap();

    // a5 shares the mover's file and e1 its rank, so both coordinates stay
    let q = mv(&pos, ChessMan::WHITE_QUEEN, Square::a1, Square::e5, MoveKind::Simple);
    assert_eq!(render(&pos, &q), "Qa1e5");
}
