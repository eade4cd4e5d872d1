//! # The move-stream interpreter.
//!
//! A single loop reads one opcode at a time and drives the shadow
//! position forward. The stream is context-dependent: a byte only means
//! anything relative to the current board and catalog, so the state here
//! must stay in perfect lockstep with the producer's. Variations are a
//! tree with backtracking, handled by an explicit stack of snapshots
//! rather than recursion.
//!
//! Decoding is best-effort. On error the partially built tree is
//! returned together with the error, and the caller decides whether to
//! keep it (this converter discards the game and logs the reason).

use crate::decode::DecodeError;
use crate::decode::annot::{Cursor, read_annotations, read_comment};
use crate::decode::opcodes::{OpCode, classify, promotion_echelon};
use crate::model::mailbox::{CastleSide, Position};
use crate::model::tree::{GameTree, NodeId};
use crate::model::{BoardFile, BoardRank, ChessColor, ChessEchelon, ChessMan, DecodedMove, MoveKind, Square};
use crate::notation::san;

/// The result of decoding one game's payload.
#[derive(Debug, Clone)]
pub struct DecodedGame {
    pub tree: GameTree,
    /// The position the game started from, for numbering and FEN.
    pub start: Position,
    /// FEN of the start position when it is not the standard one.
    pub fen: Option<String>,
    /// `None` when the stream decoded cleanly to the end-of-game marker.
    pub error: Option<DecodeError>,
}

/// Decode one game's move-stream payload against its starting position.
pub fn decode(payload: &[u8], start: Position, fen: Option<String>) -> DecodedGame {
    let mut dec = Decoder::new(payload, start.clone());
    let error = dec.run().err();
    DecodedGame {
        tree: dec.tree,
        start,
        fen,
        error,
    }
}

/// A saved branching point: the context to resume from when the
/// variation closes, plus the pre-move snapshot that lets a further
/// variation branch around the same move.
struct Frame {
    pos: Position,
    node: NodeId,
    pre: Option<Position>,
}

struct Decoder<'a> {
    cur: Cursor<'a>,
    pos: Position,
    tree: GameTree,
    node: NodeId,
    /// Snapshot taken before the last applied move of the current
    /// branch; what a variation push rewinds to.
    pre: Option<Position>,
    stack: Vec<Frame>,
}

impl<'a> Decoder<'a> {
    fn new(payload: &'a [u8], start: Position) -> Self {
        Self {
            cur: Cursor::new(payload),
            pos: start,
            tree: GameTree::new(),
            node: GameTree::ROOT,
            pre: None,
            stack: vec![],
        }
    }

    fn run(&mut self) -> Result<(), DecodeError> {
        loop {
            if self.cur.done() {
                return Err(DecodeError::TruncatedStream);
            }
            let byte = self.cur.take()?;
            match classify(byte) {
                OpCode::EndOfGame => {
                    if !self.stack.is_empty() {
                        return Err(DecodeError::UnbalancedVariation);
                    }
                    return Ok(());
                }
                OpCode::Move { ech, slot, dx, dy } => self.apply_move(ech, slot, dx, dy)?,
                OpCode::Castle(side) => self.apply_castle(side)?,
                OpCode::NullMove => self.apply_null()?,
                OpCode::PushVariation => self.push_variation()?,
                OpCode::PopVariation => self.pop_variation()?,
                OpCode::Comment => {
                    let text = read_comment(&mut self.cur)?;
                    self.tree.append_comment(self.node, &text);
                }
                OpCode::Annotation => {
                    for nag in read_annotations(&mut self.cur)? {
                        self.tree.add_nag(self.node, nag);
                    }
                }
                OpCode::Illegal => return Err(DecodeError::IllegalOpcode(byte)),
            }
        }
    }

    fn apply_move(
        &mut self,
        ech: ChessEchelon,
        slot: u8,
        dx: i8,
        dy: i8,
    ) -> Result<(), DecodeError> {
        let side = self.pos.to_move;
        let man = ChessMan::of(side, ech);
        let from = self
            .pos
            .lookup(man, slot)
            .ok_or(DecodeError::NotInCatalog(ech.name(), slot))?;

        // the table stores white's perspective
        let (dx, dy) = match side {
            ChessColor::WHITE => (dx, dy),
            ChessColor::BLACK => (-dx, -dy),
        };

        let to = match ech {
            ChessEchelon::KING | ChessEchelon::KNIGHT => {
                from.offset(dx, dy).ok_or_else(|| {
                    DecodeError::Desync(format!("{} {} walks off the board", ech.name(), slot))
                })?
            }
            _ => from.wrapping_offset(dx, dy),
        };

        let pre = self.pos.clone();

        let mut kind = if ech == ChessEchelon::PAWN && dy.abs() == 2 {
            MoveKind::DoublePush
        } else {
            MoveKind::Simple
        };
        let mut capture = None;

        match self.pos.board.get(to) {
            Some(victim) if victim.man.col() == side => {
                return Err(DecodeError::Desync(format!(
                    "own {} on {}",
                    victim.man.ech().name(),
                    to
                )));
            }
            Some(victim) => {
                capture = Some(victim.man);
                self.pos.remove(to);
            }
            None if ech == ChessEchelon::PAWN && dx != 0 => {
                // a pawn diagonal onto an empty square takes en passant
                let vsq = Square::from_coords(to.file(), from.rank());
                match self.pos.board.get(vsq) {
                    Some(v) if v.man == ChessMan::of(side.opp(), ChessEchelon::PAWN) => {
                        self.pos.remove(vsq);
                        kind = MoveKind::EnPassant;
                    }
                    _ => {
                        return Err(DecodeError::Desync(format!(
                            "no pawn to take en passant on {}",
                            vsq
                        )));
                    }
                }
            }
            None => {}
        }

        self.pos.relocate(man, slot, to)?;

        if ech == ChessEchelon::PAWN && to.rank() == BoardRank::last(side) {
            let code = self.cur.take()?;
            let pech = promotion_echelon(code).ok_or_else(|| {
                DecodeError::Desync(format!("bad promotion code 0x{:02x}", code))
            })?;
            self.pos.promote(side, slot, pech)?;
            kind = MoveKind::Promotion(pech);
        }

        self.update_shadows(man, from, to, kind, capture.is_some());
        self.commit(pre, DecodedMove { from, to, man, capture, kind });
        Ok(())
    }

    fn apply_castle(&mut self, cs: CastleSide) -> Result<(), DecodeError> {
        let side = self.pos.to_move;
        let king = ChessMan::of(side, ChessEchelon::KING);
        let kfrom = self
            .pos
            .king_square(side)
            .ok_or(DecodeError::NotInCatalog("king", 0))?;

        let home = BoardRank::home(side);
        let at = |file: BoardFile| Square::from_coords(file, home);
        let (kto, rfrom, rto, kind) = match cs {
            CastleSide::KINGSIDE => (
                at(BoardFile::g),
                at(BoardFile::h),
                at(BoardFile::f),
                MoveKind::CastleKingside,
            ),
            CastleSide::QUEENSIDE => (
                at(BoardFile::c),
                at(BoardFile::a),
                at(BoardFile::d),
                MoveKind::CastleQueenside,
            ),
        };

        let rook = self
            .pos
            .board
            .get(rfrom)
            .filter(|r| r.man == ChessMan::of(side, ChessEchelon::ROOK))
            .ok_or_else(|| {
                DecodeError::Desync(format!("no rook on {} to castle with", rfrom))
            })?;

        let pre = self.pos.clone();
        self.pos.relocate(king, 0, kto)?;
        self.pos.relocate(rook.man, rook.slot, rto)?;

        self.update_shadows(king, kfrom, kto, kind, false);
        self.commit(
            pre,
            DecodedMove { from: kfrom, to: kto, man: king, capture: None, kind },
        );
        Ok(())
    }

    fn apply_null(&mut self) -> Result<(), DecodeError> {
        let trailer = self.cur.take()?;
        if trailer != 0 {
            return Err(DecodeError::Desync(format!(
                "null move trailer 0x{:02x}",
                trailer
            )));
        }

        let side = self.pos.to_move;
        let king = ChessMan::of(side, ChessEchelon::KING);
        let ks = self
            .pos
            .king_square(side)
            .ok_or(DecodeError::NotInCatalog("king", 0))?;

        let pre = self.pos.clone();
        self.update_shadows(king, ks, ks, MoveKind::Null, false);
        self.commit(
            pre,
            DecodedMove { from: ks, to: ks, man: king, capture: None, kind: MoveKind::Null },
        );
        Ok(())
    }

    /// Save the current context and rewind to before the last applied
    /// move; the following opcodes populate a sibling branch.
    fn push_variation(&mut self) -> Result<(), DecodeError> {
        let pre = self
            .pre
            .take()
            .ok_or_else(|| DecodeError::Desync("variation push before any move".into()))?;
        let parent = self
            .tree
            .parent(self.node)
            .ok_or_else(|| DecodeError::Desync("variation push at the root".into()))?;

        self.stack.push(Frame {
            pos: std::mem::replace(&mut self.pos, pre.clone()),
            node: self.node,
            pre: Some(pre),
        });
        self.node = parent;
        Ok(())
    }

    fn pop_variation(&mut self) -> Result<(), DecodeError> {
        let frame = self.stack.pop().ok_or(DecodeError::UnbalancedVariation)?;
        self.pos = frame.pos;
        self.node = frame.node;
        self.pre = frame.pre;
        Ok(())
    }

    /// The castling-rights and en-passant shadows, the clocks, and the
    /// side to move.
    fn update_shadows(
        &mut self,
        man: ChessMan,
        from: Square,
        to: Square,
        kind: MoveKind,
        captured: bool,
    ) {
        let side = man.col();

        self.pos.en_passant = if kind == MoveKind::DoublePush {
            from.offset(0, side.sign())
        } else {
            None
        };

        if man.ech() == ChessEchelon::KING && kind != MoveKind::Null {
            self.pos.rights[side.ix()] = [false, false];
        }
        for (corner, col, cs) in [
            (Square::h1, ChessColor::WHITE, CastleSide::KINGSIDE),
            (Square::a1, ChessColor::WHITE, CastleSide::QUEENSIDE),
            (Square::h8, ChessColor::BLACK, CastleSide::KINGSIDE),
            (Square::a8, ChessColor::BLACK, CastleSide::QUEENSIDE),
        ] {
            if from == corner || to == corner {
                self.pos.rights[col.ix()][cs.ix()] = false;
            }
        }

        if man.ech() == ChessEchelon::PAWN || captured {
            self.pos.halfmove_clock = 0;
        } else {
            self.pos.halfmove_clock = self.pos.halfmove_clock.saturating_add(1);
        }
        if side.is_black() {
            self.pos.turn = self.pos.turn.saturating_add(1);
        }
        self.pos.to_move = side.opp();
    }

    fn commit(&mut self, pre: Position, mv: DecodedMove) {
        let san = san::render(&pre, &mv);
        self.node = self.tree.add_child(self.node, mv, san);
        self.pre = Some(pre);
        self.pos.sanity_check();
    }
}

#[cfg(test)]
use crate::decode::opcodes::{END_OF_GAME, NULL_MOVE, POP_VARIATION, PUSH_VARIATION, enc};

#[cfg(test)]
fn mainline_sans(game: &DecodedGame) -> Vec<String> {
    let mut res = vec![];
    let mut node = GameTree::ROOT;
    while let Some(&next) = game.tree.node(node).children.first() {
        res.push(game.tree.node(next).san.clone());
        node = next;
    }
    res
}

#[test]
fn four_ply_opening() {
    let stream = [
        enc::pawn(4, 0, 2),    // e4
        enc::pawn(4, 0, 2),    // e5
        enc::knight(1, -1, 2), // Nf3
        enc::knight(0, -1, 2), // Nc6
        END_OF_GAME,
    ];

    let game = decode(&stream, Position::startpos(), None);
    assert_eq!(game.error, None);
    assert_eq!(mainline_sans(&game), vec!["e4", "e5", "Nf3", "Nc6"]);
}

#[test]
fn side_alternates_on_moves_only() {
    let stream = [enc::pawn(4, 0, 2), enc::pawn(4, 0, 2), END_OF_GAME];
    let mut dec = Decoder::new(&stream, Position::startpos());
    assert_eq!(dec.pos.to_move, ChessColor::WHITE);
    dec.run().unwrap();
    assert_eq!(dec.pos.to_move, ChessColor::WHITE, "two plies flip twice");
    assert_eq!(dec.pos.turn, 2);
}

#[test]
fn kingside_castle_moves_both_men() {
    let mut pos = Position::empty();
    pos.place(Square::e1, ChessMan::WHITE_KING, 0).unwrap();
    pos.place(Square::h1, ChessMan::WHITE_ROOK, 1).unwrap();
    pos.place(Square::e8, ChessMan::BLACK_KING, 0).unwrap();
    pos.rights[ChessColor::WHITE.ix()] = [true, true];

    let stream = [crate::decode::opcodes::CASTLE_KINGSIDE, END_OF_GAME];
    let mut dec = Decoder::new(&stream, pos);
    dec.run().unwrap();

    assert_eq!(dec.tree.node(1).san, "O-O");
    assert_eq!(dec.pos.lookup(ChessMan::WHITE_KING, 0), Some(Square::g1));
    assert_eq!(dec.pos.lookup(ChessMan::WHITE_ROOK, 1), Some(Square::f1));
    assert_eq!(dec.pos.rights[ChessColor::WHITE.ix()], [false, false]);
}

#[test]
fn promotion_with_capture_reallocates_the_catalog() {
    let mut pos = Position::empty();
    pos.place(Square::e1, ChessMan::WHITE_KING, 0).unwrap();
    pos.place(Square::e8, ChessMan::BLACK_KING, 0).unwrap();
    pos.place(Square::c1, ChessMan::WHITE_BISHOP, 0).unwrap();
    pos.place(Square::b2, ChessMan::BLACK_PAWN, 1).unwrap();
    pos.place(Square::d8, ChessMan::BLACK_QUEEN, 0).unwrap();
    pos.to_move = ChessColor::BLACK;

    // black pawn #1 captures toward the queenside and names a queen
    let stream = [enc::pawn(1, -1, 1), 0, END_OF_GAME];
    let mut dec = Decoder::new(&stream, pos);
    dec.run().unwrap();

    assert_eq!(dec.tree.node(1).san, "bxc1=Q");
    assert_eq!(dec.pos.lookup(ChessMan::BLACK_PAWN, 1), None, "pawn slot freed");
    assert_eq!(
        dec.pos.lookup(ChessMan::BLACK_QUEEN, 1),
        Some(Square::c1),
        "new queen takes the lowest free slot"
    );
}

#[test]
fn en_passant_takes_the_bypassing_pawn() {
    let mut pos = Position::empty();
    pos.place(Square::e1, ChessMan::WHITE_KING, 0).unwrap();
    pos.place(Square::e8, ChessMan::BLACK_KING, 0).unwrap();
    pos.place(Square::e5, ChessMan::WHITE_PAWN, 4).unwrap();
    pos.place(Square::d5, ChessMan::BLACK_PAWN, 3).unwrap();
    pos.en_passant = Some(Square::d6);

    let stream = [enc::pawn(4, -1, 1), END_OF_GAME];
    let mut dec = Decoder::new(&stream, pos);
    dec.run().unwrap();

    assert_eq!(dec.tree.node(1).san, "exd6");
    assert_eq!(dec.tree.node(1).mv.unwrap().kind, MoveKind::EnPassant);
    assert_eq!(dec.pos.lookup(ChessMan::BLACK_PAWN, 3), None, "victim removed");
}

#[test]
fn variation_rewinds_and_resumes() {
    let stream = [
        enc::pawn(4, 0, 2), // e4
        enc::pawn(4, 0, 2), // e5
        PUSH_VARIATION,
        enc::pawn(2, 0, 2), // c5, branching around e5
    ]
    .into_iter()
    .chain(enc::comment("Sicilian"))
    .chain([POP_VARIATION, enc::knight(1, -1, 2), END_OF_GAME])
    .collect::<Vec<_>>();

    let mut dec = Decoder::new(&stream, Position::startpos());
    dec.run().unwrap();
    assert!(dec.stack.is_empty(), "push and pop balance out");

    let game = DecodedGame {
        tree: dec.tree.clone(),
        start: Position::startpos(),
        fen: None,
        error: None,
    };
    assert_eq!(mainline_sans(&game), vec!["e4", "e5", "Nf3"]);

    let e4 = dec.tree.node(GameTree::ROOT).children[0];
    let kids = &dec.tree.node(e4).children;
    assert_eq!(kids.len(), 2, "e5 mainline plus the c5 variation");
    let (e5, c5) = (kids[0], kids[1]);
    assert_eq!(dec.tree.node(e5).san, "e5");
    assert_eq!(dec.tree.node(c5).san, "c5");
    assert_eq!(dec.tree.node(c5).comment.as_deref(), Some("Sicilian"));
    assert_eq!(
        dec.tree.node(dec.tree.node(e5).children[0]).san,
        "Nf3",
        "mainline resumed under the move the variation branched around"
    );
}

#[test]
fn null_move_flips_side_without_touching_the_board() {
    let stream = [NULL_MOVE, 0x00, END_OF_GAME];
    let mut dec = Decoder::new(&stream, Position::startpos());
    dec.run().unwrap();
    assert_eq!(dec.pos.to_move, ChessColor::BLACK);
    assert_eq!(dec.tree.node(1).san, "--");
    assert_eq!(dec.pos.lookup(ChessMan::WHITE_PAWN, 4), Some(Square::e2));
}

#[test]
fn missing_rook_reports_its_slot() {
    let mut pos = Position::empty();
    pos.place(Square::e1, ChessMan::WHITE_KING, 0).unwrap();
    pos.place(Square::e8, ChessMan::BLACK_KING, 0).unwrap();

    let game = decode(&[enc::rook(1, 1, 0), END_OF_GAME], pos, None);
    let err = game.error.unwrap();
    assert_eq!(err, DecodeError::NotInCatalog("rook", 1));
    assert_eq!(err.to_string(), "rook 1 not in catalog");
}

#[test]
fn truncated_stream_keeps_the_partial_tree() {
    let game = decode(&[enc::pawn(4, 0, 2)], Position::startpos(), None);
    assert_eq!(game.error, Some(DecodeError::TruncatedStream));
    assert_eq!(mainline_sans(&game), vec!["e4"]);
}

#[test]
fn pop_without_push_is_unbalanced() {
    let game = decode(&[POP_VARIATION, END_OF_GAME], Position::startpos(), None);
    assert_eq!(game.error, Some(DecodeError::UnbalancedVariation));
}

#[test]
fn illegal_byte_is_rejected() {
    let game = decode(&[0xFF], Position::startpos(), None);
    assert_eq!(game.error, Some(DecodeError::IllegalOpcode(0xFF)));
}

#[test]
fn double_push_sets_the_en_passant_shadow() {
    let stream = [enc::pawn(4, 0, 2), END_OF_GAME];
    let mut dec = Decoder::new(&stream, Position::startpos());
    dec.run().unwrap();
    assert_eq!(dec.pos.en_passant, Some(Square::e3));
}
