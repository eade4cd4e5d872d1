//! # The mailbox representation of a chessboard, paired with a piece catalog.
//!
//! The mailbox is the simple board-centric representation: one value per
//! square. Here every occupied square also remembers which catalog slot
//! its man sits in, because the move stream names pieces by slot rather
//! than by square.
//!
//! The catalog is the piece-centric mirror: for every (color, echelon,
//! slot) it records the square the man currently stands on. Both sides
//! are mutated in lockstep; [`Position::sanity_check`] asserts the
//! bijection in test builds.

use thiserror::Error;

use crate::model::{BoardFile, BoardRank, ChessColor, ChessEchelon, ChessMan, Square};

/// Which way a king castles.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum CastleSide {
    KINGSIDE = 0,
    QUEENSIDE = 1,
}

impl CastleSide {
    #[inline]
    pub fn ix(self) -> usize {
        self as usize
    }
}

/// A chessman standing on a square, tagged with its catalog slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resident {
    pub man: ChessMan,
    pub slot: u8,
}

#[derive(Debug, Clone)]
#[repr(transparent)]
pub struct Mailbox(pub [Option<Resident>; 64]);

impl Mailbox {
    pub fn empty() -> Self {
        Self([None; 64])
    }

    #[inline]
    pub fn get(&self, sq: Square) -> Option<Resident> {
        self.0[sq.ix()]
    }

    #[inline]
    pub fn set(&mut self, sq: Square, it: Option<Resident>) {
        self.0[sq.ix()] = it;
    }
}

/// Slots per (color, echelon) bucket. Eight covers the pawns and any
/// realistic number of promoted officers.
pub const BUCKET_SLOTS: usize = 8;

#[derive(Debug, Clone)]
pub struct PieceCatalog {
    slots: [[[Option<Square>; BUCKET_SLOTS]; 6]; 2],
}

impl PieceCatalog {
    pub fn empty() -> Self {
        Self {
            slots: [[[None; BUCKET_SLOTS]; 6]; 2],
        }
    }

    #[inline]
    pub fn bucket(&self, col: ChessColor, ech: ChessEchelon) -> &[Option<Square>; BUCKET_SLOTS] {
        &self.slots[col.ix()][ech.ix()]
    }

    #[inline]
    fn bucket_mut(
        &mut self,
        col: ChessColor,
        ech: ChessEchelon,
    ) -> &mut [Option<Square>; BUCKET_SLOTS] {
        &mut self.slots[col.ix()][ech.ix()]
    }

    #[inline]
    pub fn lookup(&self, man: ChessMan, slot: u8) -> Option<Square> {
        *self.bucket(man.col(), man.ech()).get(slot as usize)?
    }

    /// The least slot not currently assigned in the bucket.
    pub fn lowest_free(&self, col: ChessColor, ech: ChessEchelon) -> Option<u8> {
        self.bucket(col, ech)
            .iter()
            .position(|s| s.is_none())
            .map(|ix| ix as u8)
    }
}

#[derive(Debug, Clone, Error)]
pub enum CatalogFault {
    #[error("square {0:?} is occupied")]
    Occupied(Square),
    #[error("{0} slot {1} is already assigned")]
    SlotTaken(&'static str, u8),
    #[error("{0} {1} not in catalog")]
    Missing(&'static str, u8),
    #[error("{0} bucket has no free slot")]
    BucketFull(&'static str),
}

/// The full shadow state the decoder drives: board, catalog, side to
/// move, and the transient castling / en-passant / clock fields.
/// `Clone` is the snapshot operation.
#[derive(Debug, Clone)]
pub struct Position {
    pub board: Mailbox,
    pub catalog: PieceCatalog,
    pub to_move: ChessColor,
    /// Castling rights, indexed `[color][castle side]`.
    pub rights: [[bool; 2]; 2],
    /// Square a pawn just double-pushed over, if any.
    pub en_passant: Option<Square>,
    pub halfmove_clock: u8,
    pub turn: u16,
}

impl Position {
    pub fn empty() -> Self {
        Self {
            board: Mailbox::empty(),
            catalog: PieceCatalog::empty(),
            to_move: ChessColor::WHITE,
            rights: [[false; 2]; 2],
            en_passant: None,
            halfmove_clock: 0,
            turn: 1,
        }
    }

    /// The standard initial position. Officers take slots left to right
    /// as seen from white (queenside rook = 0, kingside rook = 1), pawns
    /// take their file as slot, kings sit in slot 0 of their bucket.
    pub fn startpos() -> Self {
        use ChessEchelon::*;

        let mut res = Self::empty();
        res.rights = [[true; 2]; 2];

        let back = [ROOK, KNIGHT, BISHOP, QUEEN, KING, BISHOP, KNIGHT, ROOK];
        for col in [ChessColor::WHITE, ChessColor::BLACK] {
            let home = BoardRank::home(col);
            let pawn_rank = match col {
                ChessColor::WHITE => BoardRank::r2,
                ChessColor::BLACK => BoardRank::r7,
            };
            let mut seen = [0u8; 6];
            for (fx, ech) in back.iter().enumerate() {
                let sq = Square::from_coords(BoardFile::from_u8(fx as u8), home);
                let slot = seen[ech.ix()];
                seen[ech.ix()] += 1;
                res.place(sq, ChessMan::of(col, *ech), slot).unwrap();
            }
            for fx in 0..8u8 {
                let sq = Square::from_coords(BoardFile::from_u8(fx), pawn_rank);
                res.place(sq, ChessMan::of(col, PAWN), fx).unwrap();
            }
        }

        res
    }

    /// Put a man on an empty square and claim its catalog slot.
    pub fn place(&mut self, sq: Square, man: ChessMan, slot: u8) -> Result<(), CatalogFault> {
        if self.board.get(sq).is_some() {
            return Err(CatalogFault::Occupied(sq));
        }
        if self.catalog.lookup(man, slot).is_some() {
            return Err(CatalogFault::SlotTaken(man.ech().name(), slot));
        }
        self.board.set(sq, Some(Resident { man, slot }));
        self.catalog.bucket_mut(man.col(), man.ech())[slot as usize] = Some(sq);
        Ok(())
    }

    /// Take a man off the board and release its slot.
    pub fn remove(&mut self, sq: Square) -> Option<Resident> {
        let res = self.board.get(sq)?;
        self.board.set(sq, None);
        self.catalog.bucket_mut(res.man.col(), res.man.ech())[res.slot as usize] = None;
        Some(res)
    }

    #[inline]
    pub fn lookup(&self, man: ChessMan, slot: u8) -> Option<Square> {
        self.catalog.lookup(man, slot)
    }

    /// Move the man in (man, slot) to an empty square, updating board and
    /// catalog together. The destination must have been cleared first.
    pub fn relocate(&mut self, man: ChessMan, slot: u8, to: Square) -> Result<(), CatalogFault> {
        let from = self
            .catalog
            .lookup(man, slot)
            .ok_or(CatalogFault::Missing(man.ech().name(), slot))?;
        if self.board.get(to).is_some() {
            return Err(CatalogFault::Occupied(to));
        }
        self.board.set(from, None);
        self.board.set(to, Some(Resident { man, slot }));
        self.catalog.bucket_mut(man.col(), man.ech())[slot as usize] = Some(to);
        Ok(())
    }

    /// Swap the pawn in `pawn_slot` for a new man of `ech` on the same
    /// square, taking the lowest free slot of the target bucket.
    /// Returns the new slot.
    pub fn promote(
        &mut self,
        col: ChessColor,
        pawn_slot: u8,
        ech: ChessEchelon,
    ) -> Result<u8, CatalogFault> {
        let pawn = ChessMan::of(col, ChessEchelon::PAWN);
        let sq = self
            .catalog
            .lookup(pawn, pawn_slot)
            .ok_or(CatalogFault::Missing(ChessEchelon::PAWN.name(), pawn_slot))?;
        self.remove(sq);
        let slot = self
            .catalog
            .lowest_free(col, ech)
            .ok_or(CatalogFault::BucketFull(ech.name()))?;
        self.place(sq, ChessMan::of(col, ech), slot)?;
        Ok(slot)
    }

    pub fn king_square(&self, col: ChessColor) -> Option<Square> {
        self.catalog.lookup(ChessMan::of(col, ChessEchelon::KING), 0)
    }

    /// Assert the board/catalog bijection.
    #[cfg(test)]
    pub fn sanity_check(&self) {
        use strum::VariantArray;

        for man in ChessMan::VARIANTS {
            for slot in 0..BUCKET_SLOTS as u8 {
                if let Some(sq) = self.catalog.lookup(*man, slot) {
                    assert_eq!(
                        self.board.get(sq),
                        Some(Resident { man: *man, slot }),
                        "catalog says {:?} {} is on {:?}",
                        man,
                        slot,
                        sq
                    );
                }
            }
        }
        for ix in 0..64u8 {
            let sq = Square::from_u8(ix);
            if let Some(res) = self.board.get(sq) {
                assert_eq!(
                    self.catalog.lookup(res.man, res.slot),
                    Some(sq),
                    "board says {:?} {} is on {:?}",
                    res.man,
                    res.slot,
                    sq
                );
            }
        }
    }

    #[cfg(not(test))]
    pub fn sanity_check(&self) {}
}

#[test]
fn startpos_is_coherent() {
    let pos = Position::startpos();
    pos.sanity_check();

    assert_eq!(
        pos.lookup(ChessMan::WHITE_ROOK, 0),
        Some(Square::a1),
        "queenside rook is slot 0"
    );
    assert_eq!(pos.lookup(ChessMan::WHITE_ROOK, 1), Some(Square::h1));
    assert_eq!(pos.lookup(ChessMan::BLACK_KNIGHT, 1), Some(Square::g8));
    assert_eq!(pos.lookup(ChessMan::WHITE_PAWN, 4), Some(Square::e2));
    assert_eq!(pos.king_square(ChessColor::BLACK), Some(Square::e8));
}

#[test]
fn relocate_updates_both_sides() {
    let mut pos = Position::startpos();
    pos.relocate(ChessMan::WHITE_KNIGHT, 1, Square::f3).unwrap();
    pos.sanity_check();
    assert_eq!(pos.board.get(Square::g1), None);
    assert_eq!(pos.lookup(ChessMan::WHITE_KNIGHT, 1), Some(Square::f3));
}

#[test]
fn promote_takes_lowest_free_slot() {
    let mut pos = Position::empty();
    pos.place(Square::c1, ChessMan::BLACK_PAWN, 1).unwrap();
    pos.place(Square::d8, ChessMan::BLACK_QUEEN, 0).unwrap();

    let slot = pos
        .promote(ChessColor::BLACK, 1, ChessEchelon::QUEEN)
        .unwrap();
    assert_eq!(slot, 1, "slot 0 is taken by the original queen");
    pos.sanity_check();

    assert_eq!(pos.lookup(ChessMan::BLACK_PAWN, 1), None, "pawn slot freed");
    assert_eq!(pos.lookup(ChessMan::BLACK_QUEEN, 1), Some(Square::c1));
}

#[test]
fn place_refuses_occupied_square() {
    let mut pos = Position::startpos();
    assert!(pos.place(Square::e2, ChessMan::WHITE_QUEEN, 1).is_err());
}
