use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::GameError;

/// FEN of the standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// The two sides of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Rank delta of a pawn advance.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Rank holding this side's king and rooks at the start of the game.
    pub fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    pub fn pawn_start_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    pub fn promotion_rank(self) -> u8 {
        self.opposite().back_rank()
    }

    pub fn name(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl std::ops::Not for Color {
    type Output = Color;

    fn not(self) -> Color {
        self.opposite()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    /// Lowercase letter used on the wire and in FEN.
    pub fn to_char(self) -> char {
        match self {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
        }
    }

    pub fn from_char(c: char) -> Option<PieceType> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }

    /// Parses a promotion choice. Only knight, bishop, rook and queen qualify.
    pub fn promotion_from_str(s: &str) -> Option<PieceType> {
        let mut chars = s.chars();
        match (chars.next().and_then(PieceType::from_char), chars.next()) {
            (Some(kind), None) if kind.is_promotion_choice() => Some(kind),
            _ => None,
        }
    }

    pub fn is_promotion_choice(self) -> bool {
        matches!(
            self,
            PieceType::Knight | PieceType::Bishop | PieceType::Rook | PieceType::Queen
        )
    }

    /// Material points used to settle a timeout. Kings count nothing.
    pub fn material(self) -> u32 {
        match self {
            PieceType::Pawn => 1,
            PieceType::Knight | PieceType::Bishop => 3,
            PieceType::Rook => 5,
            PieceType::Queen => 9,
            PieceType::King => 0,
        }
    }

    /// Centipawn value used to rank AI candidates.
    pub fn value(self) -> u32 {
        match self {
            PieceType::Pawn => 100,
            PieceType::Knight => 320,
            PieceType::Bishop => 330,
            PieceType::Rook => 500,
            PieceType::Queen => 900,
            PieceType::King => 20000,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceType::Pawn => "pawn",
            PieceType::Knight => "knight",
            PieceType::Bishop => "bishop",
            PieceType::Rook => "rook",
            PieceType::Queen => "queen",
            PieceType::King => "king",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceType,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceType, color: Color) -> Self {
        Piece { kind, color }
    }

    fn to_fen_char(self) -> char {
        let c = self.kind.to_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    fn from_fen_char(c: char) -> Option<Piece> {
        let kind = PieceType::from_char(c)?;
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        Some(Piece { kind, color })
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.color, self.kind.name())
    }
}

/// A board coordinate. File 0 is the a-file, rank 0 is white's back rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        (file < 8 && rank < 8).then_some(Square { file, rank })
    }

    /// Builds a square from coordinates already known to be in range.
    pub(crate) const fn at(file: u8, rank: u8) -> Square {
        Square { file: file & 7, rank: rank & 7 }
    }

    pub fn file(self) -> u8 {
        self.file
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    /// The square `(df, dr)` away, or `None` when that leaves the board.
    pub fn offset(self, df: i8, dr: i8) -> Option<Square> {
        let file = self.file as i8 + df;
        let rank = self.rank as i8 + dr;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Square { file: file as u8, rank: rank as u8 })
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|rank| (0..8u8).map(move |file| Square { file, rank }))
    }

    pub fn from_algebraic(s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank)
    }

    pub fn to_algebraic(self) -> String {
        let file = (b'a' + self.file) as char;
        let rank = (b'1' + self.rank) as char;
        format!("{file}{rank}")
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_algebraic())
    }
}

impl FromStr for Square {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Square::from_algebraic(s).ok_or_else(|| GameError::InvalidSquare(s.to_string()))
    }
}

/// 8x8 grid of optional pieces, indexed `[rank][file]`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BoardState {
    squares: [[Option<Piece>; 8]; 8],
}

impl BoardState {
    pub fn empty() -> Self {
        BoardState::default()
    }

    pub fn standard() -> Self {
        const BACK: [PieceType; 8] = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        let mut board = BoardState::empty();
        for color in Color::ALL {
            for (file, kind) in BACK.iter().enumerate() {
                board.squares[color.back_rank() as usize][file] = Some(Piece::new(*kind, color));
                board.squares[color.pawn_start_rank() as usize][file] =
                    Some(Piece::new(PieceType::Pawn, color));
            }
        }
        board
    }

    pub fn get(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.rank as usize][sq.file as usize]
    }

    pub fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.rank as usize][sq.file as usize] = piece;
    }

    pub fn take(&mut self, sq: Square) -> Option<Piece> {
        self.squares[sq.rank as usize][sq.file as usize].take()
    }

    pub fn is_empty(&self, sq: Square) -> bool {
        self.get(sq).is_none()
    }

    pub fn find_king(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceType::King && p.color == color)
            .map(|(sq, _)| sq)
    }

    /// Every occupied square with its piece, rank by rank from a1.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.get(sq).map(|p| (sq, p)))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.color == color)
    }
}

/// Castling flags for one side. Each flag only ever goes from `false` to `true`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideCastling {
    pub king_moved: bool,
    pub king_side_rook_moved: bool,
    pub queen_side_rook_moved: bool,
}

impl SideCastling {
    pub fn can_castle_king_side(&self) -> bool {
        !self.king_moved && !self.king_side_rook_moved
    }

    pub fn can_castle_queen_side(&self) -> bool {
        !self.king_moved && !self.queen_side_rook_moved
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CastlingRights {
    pub white: SideCastling,
    pub black: SideCastling,
}

impl CastlingRights {
    pub fn side(&self, color: Color) -> &SideCastling {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn side_mut(&mut self, color: Color) -> &mut SideCastling {
        match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        }
    }

    /// Records that whatever stood on `sq` has left it (moved or been captured).
    /// Only the home squares of kings and rooks affect the flags.
    pub fn vacate(&mut self, sq: Square) {
        for color in Color::ALL {
            if sq.rank() != color.back_rank() {
                continue;
            }
            let side = self.side_mut(color);
            match sq.file() {
                0 => side.queen_side_rook_moved = true,
                4 => side.king_moved = true,
                7 => side.king_side_rook_moved = true,
                _ => {}
            }
        }
    }
}

/// A full position: board plus every field that influences move generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub board: BoardState,
    pub turn: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub move_number: u32,
}

impl Default for Position {
    fn default() -> Self {
        Position::standard()
    }
}

impl Position {
    pub fn standard() -> Self {
        Position {
            board: BoardState::standard(),
            turn: Color::White,
            castling: CastlingRights::default(),
            en_passant: None,
            halfmove_clock: 0,
            move_number: 1,
        }
    }

    pub fn from_fen(fen: &str) -> Result<Position, GameError> {
        let invalid = |why: &str| GameError::InvalidFen(format!("{fen}: {why}"));
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(invalid("expected at least 4 fields"));
        }

        let mut board = BoardState::empty();
        let rows: Vec<&str> = fields[0].split('/').collect();
        if rows.len() != 8 {
            return Err(invalid("expected 8 ranks"));
        }
        for (i, row) in rows.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in row.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file = file.saturating_add(skip as u8);
                    if file > 8 {
                        return Err(invalid("rank too long"));
                    }
                    continue;
                }
                let piece = Piece::from_fen_char(c).ok_or_else(|| invalid("bad piece letter"))?;
                let sq = Square::new(file, rank).ok_or_else(|| invalid("rank too long"))?;
                board.set(sq, Some(piece));
                file += 1;
            }
            if file != 8 {
                return Err(invalid("rank does not cover 8 files"));
            }
        }

        let turn = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(invalid("bad side to move")),
        };

        let mut castling = CastlingRights::default();
        let flags = fields[2];
        for color in Color::ALL {
            let (k, q) = match color {
                Color::White => ('K', 'Q'),
                Color::Black => ('k', 'q'),
            };
            let side = castling.side_mut(color);
            side.king_side_rook_moved = !flags.contains(k);
            side.queen_side_rook_moved = !flags.contains(q);
            side.king_moved = side.king_side_rook_moved && side.queen_side_rook_moved;
        }

        let en_passant = match fields[3] {
            "-" => None,
            s => Some(Square::from_algebraic(s).ok_or_else(|| invalid("bad en passant square"))?),
        };

        let halfmove_clock = match fields.get(4) {
            Some(s) => s.parse().map_err(|_| invalid("bad halfmove clock"))?,
            None => 0,
        };
        let move_number = match fields.get(5) {
            Some(s) => s.parse().map_err(|_| invalid("bad move number"))?,
            None => 1,
        };

        Ok(Position { board, turn, castling, en_passant, halfmove_clock, move_number })
    }

    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for rank in (0..8u8).rev() {
            let mut gap = 0;
            for file in 0..8u8 {
                match Square::new(file, rank).and_then(|sq| self.board.get(sq)) {
                    Some(piece) => {
                        if gap > 0 {
                            placement.push_str(&gap.to_string());
                            gap = 0;
                        }
                        placement.push(piece.to_fen_char());
                    }
                    None => gap += 1,
                }
            }
            if gap > 0 {
                placement.push_str(&gap.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }

        let mut flags = String::new();
        for color in Color::ALL {
            let side = self.castling.side(color);
            let (k, q) = match color {
                Color::White => ('K', 'Q'),
                Color::Black => ('k', 'q'),
            };
            if side.can_castle_king_side() {
                flags.push(k);
            }
            if side.can_castle_queen_side() {
                flags.push(q);
            }
        }
        if flags.is_empty() {
            flags.push('-');
        }

        let turn = match self.turn {
            Color::White => "w",
            Color::Black => "b",
        };
        let ep = self.en_passant.map_or_else(|| "-".to_string(), Square::to_algebraic);
        format!(
            "{placement} {turn} {flags} {ep} {} {}",
            self.halfmove_clock, self.move_number
        )
    }
}
