use strum::{EnumIs, FromRepr, VariantArray, VariantNames};

pub mod mailbox;
pub mod tree;

/// Basic square enum
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    FromRepr, VariantNames)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Square {
    a1 = 0o00, b1 = 0o01, c1 = 0o02, d1 = 0o03, e1 = 0o04, f1 = 0o05, g1 = 0o06, h1 = 0o07,
    a2 = 0o10, b2 = 0o11, c2 = 0o12, d2 = 0o13, e2 = 0o14, f2 = 0o15, g2 = 0o16, h2 = 0o17,
    a3 = 0o20, b3 = 0o21, c3 = 0o22, d3 = 0o23, e3 = 0o24, f3 = 0o25, g3 = 0o26, h3 = 0o27,
    a4 = 0o30, b4 = 0o31, c4 = 0o32, d4 = 0o33, e4 = 0o34, f4 = 0o35, g4 = 0o36, h4 = 0o37,
    a5 = 0o40, b5 = 0o41, c5 = 0o42, d5 = 0o43, e5 = 0o44, f5 = 0o45, g5 = 0o46, h5 = 0o47,
    a6 = 0o50, b6 = 0o51, c6 = 0o52, d6 = 0o53, e6 = 0o54, f6 = 0o55, g6 = 0o56, h6 = 0o57,
    a7 = 0o60, b7 = 0o61, c7 = 0o62, d7 = 0o63, e7 = 0o64, f7 = 0o65, g7 = 0o66, h7 = 0o67,
    a8 = 0o70, b8 = 0o71, c8 = 0o72, d8 = 0o73, e8 = 0o74, f8 = 0o75, g8 = 0o76, h8 = 0o77,
}

impl Square {
    #[inline]
    pub fn ix(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_u8(ix: u8) -> Self {
        Self::from_repr(ix & 0x3F).unwrap()
    }

    #[inline]
    pub fn from_coords(file: BoardFile, rank: BoardRank) -> Self {
        Self::from_u8((rank.ix() as u8) << 3 | file.ix() as u8)
    }

    #[inline]
    pub fn file(self) -> BoardFile {
        BoardFile::from_u8(self as u8 & 0x7)
    }

    #[inline]
    pub fn rank(self) -> BoardRank {
        BoardRank::from_u8(self as u8 >> 3)
    }

    /// Literal displacement. `None` when the target leaves the board.
    pub fn offset(self, dx: i8, dy: i8) -> Option<Self> {
        let f = self.file().ix() as i8 + dx;
        let r = self.rank().ix() as i8 + dy;
        if (0..8).contains(&f) && (0..8).contains(&r) {
            Some(Self::from_u8((r as u8) << 3 | f as u8))
        } else {
            None
        }
    }

    /// Displacement with mod-8 wrap on both coordinates, the way the
    /// move-stream encodes sliding-piece and pawn travel.
    pub fn wrapping_offset(self, dx: i8, dy: i8) -> Self {
        let f = (self.file().ix() as i8 + dx).rem_euclid(8);
        let r = (self.rank().ix() as i8 + dy).rem_euclid(8);
        Self::from_u8((r as u8) << 3 | f as u8)
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr, VariantArray)]
#[repr(u8)]
pub enum BoardFile {
    a = 0, b, c, d, e, f, g, h,
}

impl BoardFile {
    #[inline]
    pub fn ix(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_u8(ix: u8) -> Self {
        Self::from_repr(ix & 0x7).unwrap()
    }

    #[inline]
    pub fn letter(self) -> char {
        (b'a' + self as u8) as char
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr, VariantArray)]
#[repr(u8)]
pub enum BoardRank {
    r1 = 0, r2, r3, r4, r5, r6, r7, r8,
}

impl BoardRank {
    #[inline]
    pub fn ix(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_u8(ix: u8) -> Self {
        Self::from_repr(ix & 0x7).unwrap()
    }

    #[inline]
    pub fn digit(self) -> char {
        (b'1' + self as u8) as char
    }

    /// The back rank of the given color, where its officers start.
    #[inline]
    pub fn home(col: ChessColor) -> Self {
        match col {
            ChessColor::WHITE => Self::r1,
            ChessColor::BLACK => Self::r8,
        }
    }

    /// The promotion rank of the given color.
    #[inline]
    pub fn last(col: ChessColor) -> Self {
        Self::home(col.opp())
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIs)]
#[repr(u8)]
pub enum ChessColor {
    WHITE = 0,
    BLACK = 1,
}

impl ChessColor {
    #[inline]
    pub fn opp(self) -> Self {
        match self {
            Self::WHITE => Self::BLACK,
            Self::BLACK => Self::WHITE,
        }
    }

    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Self::WHITE => 1,
            Self::BLACK => -1,
        }
    }

    #[inline]
    pub fn ix(self) -> usize {
        self as usize
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr, VariantArray)]
#[repr(u8)]
pub enum ChessEchelon {
    PAWN = 1,
    KNIGHT = 2,
    BISHOP = 3,
    ROOK = 4,
    QUEEN = 5,
    KING = 6,
}

impl ChessEchelon {
    #[inline]
    pub fn ix(self) -> usize {
        self as usize - 1
    }

    /// Upper-case letter used in standard algebraic notation; pawns have none.
    #[inline]
    pub fn san_letter(self) -> &'static str {
        ["", "N", "B", "R", "Q", "K"][self.ix()]
    }

    /// Lower-case name used in catalog diagnostics.
    #[inline]
    pub fn name(self) -> &'static str {
        ["pawn", "knight", "bishop", "rook", "queen", "king"][self.ix()]
    }
}

/// A colored chessman. The representation is `color * 6 + echelon`, so
/// both components recover with plain arithmetic.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr, VariantArray)]
#[repr(u8)]
pub enum ChessMan {
    WHITE_PAWN = 1,
    WHITE_KNIGHT = 2,
    WHITE_BISHOP = 3,
    WHITE_ROOK = 4,
    WHITE_QUEEN = 5,
    WHITE_KING = 6,
    BLACK_PAWN = 7,
    BLACK_KNIGHT = 8,
    BLACK_BISHOP = 9,
    BLACK_ROOK = 10,
    BLACK_QUEEN = 11,
    BLACK_KING = 12,
}

impl ChessMan {
    #[inline]
    pub fn of(col: ChessColor, ech: ChessEchelon) -> Self {
        Self::from_repr(col as u8 * 6 + ech as u8).unwrap()
    }

    #[inline]
    pub fn col(self) -> ChessColor {
        if (self as u8) <= 6 {
            ChessColor::WHITE
        } else {
            ChessColor::BLACK
        }
    }

    #[inline]
    pub fn ech(self) -> ChessEchelon {
        ChessEchelon::from_repr((self as u8 - 1) % 6 + 1).unwrap()
    }

    /// FEN letter: upper case for white, lower case for black.
    pub fn fen_char(self) -> char {
        let c = ['p', 'n', 'b', 'r', 'q', 'k'][self.ech().ix()];
        match self.col() {
            ChessColor::WHITE => c.to_ascii_uppercase(),
            ChessColor::BLACK => c,
        }
    }

    pub fn from_fen_char(c: char) -> Option<Self> {
        let ech = match c.to_ascii_lowercase() {
            'p' => ChessEchelon::PAWN,
            'n' => ChessEchelon::KNIGHT,
            'b' => ChessEchelon::BISHOP,
            'r' => ChessEchelon::ROOK,
            'q' => ChessEchelon::QUEEN,
            'k' => ChessEchelon::KING,
            _ => return None,
        };
        let col = if c.is_ascii_uppercase() {
            ChessColor::WHITE
        } else {
            ChessColor::BLACK
        };
        Some(Self::of(col, ech))
    }
}

/// What a decoded move does besides relocating its man.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Simple,
    DoublePush,
    EnPassant,
    CastleKingside,
    CastleQueenside,
    Promotion(ChessEchelon),
    Null,
}

/// One move as reconstructed from the stream, before notation rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedMove {
    pub from: Square,
    pub to: Square,
    pub man: ChessMan,
    pub capture: Option<ChessMan>,
    pub kind: MoveKind,
}

impl DecodedMove {
    pub fn is_capture(self) -> bool {
        self.capture.is_some() || self.kind == MoveKind::EnPassant
    }
}

#[test]
fn square_coords_roundtrip() {
    for ix in 0..64u8 {
        let sq = Square::from_u8(ix);
        assert_eq!(Square::from_coords(sq.file(), sq.rank()), sq);
    }
    assert_eq!(Square::e4.file(), BoardFile::e);
    assert_eq!(Square::e4.rank(), BoardRank::r4);
}

#[test]
fn wrapping_offset_wraps_both_ways() {
    assert_eq!(Square::h4.wrapping_offset(1, 0), Square::a4);
    assert_eq!(Square::a1.wrapping_offset(-1, -1), Square::h8);
    assert_eq!(Square::d4.wrapping_offset(3, 0), Square::g4);
}

#[test]
fn chessman_components() {
    for man in ChessMan::VARIANTS {
        assert_eq!(ChessMan::of(man.col(), man.ech()), *man);
    }
    assert_eq!(ChessMan::BLACK_QUEEN.fen_char(), 'q');
    assert_eq!(ChessMan::from_fen_char('K'), Some(ChessMan::WHITE_KING));
}
