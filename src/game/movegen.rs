//! Pseudo-legal move generation.
//!
//! Candidates follow each piece's movement pattern and the board's occupancy
//! but ignore whether the mover's own king ends up attacked; see
//! [`crate::game::legality`] for that filter.

use crate::game::board::{BoardState, Color, Piece, PieceType, Position, Square};

pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];
pub const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
pub const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
pub const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    /// Rook origin and destination for this castle.
    pub fn rook_squares(self, color: Color) -> (Square, Square) {
        let rank = color.back_rank();
        let (from, to) = match self {
            CastleSide::King => (7, 5),
            CastleSide::Queen => (0, 3),
        };
        (Square::at(from, rank), Square::at(to, rank))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecialMove {
    EnPassant,
    Castle(CastleSide),
    /// Pawn arrives on its last rank.
    Promotion,
}

/// One pseudo-legal candidate move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub from: Square,
    pub to: Square,
    pub capture: bool,
    pub special: Option<SpecialMove>,
}

impl Candidate {
    fn quiet(from: Square, to: Square) -> Self {
        Candidate { from, to, capture: false, special: None }
    }

    fn capture(from: Square, to: Square) -> Self {
        Candidate { from, to, capture: true, special: None }
    }

    pub fn is_en_passant(&self) -> bool {
        self.special == Some(SpecialMove::EnPassant)
    }

    pub fn is_promotion(&self) -> bool {
        self.special == Some(SpecialMove::Promotion)
    }

    pub fn castle_side(&self) -> Option<CastleSide> {
        match self.special {
            Some(SpecialMove::Castle(side)) => Some(side),
            _ => None,
        }
    }

    /// Square of the piece this move removes, if any.
    pub fn captured_square(&self) -> Option<Square> {
        if self.is_en_passant() {
            Square::new(self.to.file(), self.from.rank())
        } else if self.capture {
            Some(self.to)
        } else {
            None
        }
    }

    /// Moves the piece (and the castling rook or en passant victim) on
    /// `board`. Returns the captured piece. Promotion is left to the caller.
    pub fn apply_to(&self, board: &mut BoardState) -> Option<Piece> {
        let captured = if self.is_en_passant() {
            self.captured_square().and_then(|sq| board.take(sq))
        } else {
            board.get(self.to)
        };
        let mover = board.take(self.from);
        board.set(self.to, mover);
        if let (Some(side), Some(piece)) = (self.castle_side(), mover) {
            let (rook_from, rook_to) = side.rook_squares(piece.color);
            let rook = board.take(rook_from);
            board.set(rook_to, rook);
        }
        captured
    }
}

/// All pseudo-legal candidates for the piece on `from`. Empty when the square
/// is empty.
pub fn pseudo_legal_moves(pos: &Position, from: Square) -> Vec<Candidate> {
    let Some(piece) = pos.board.get(from) else {
        return Vec::new();
    };
    let mut moves = Vec::new();
    match piece.kind {
        PieceType::Pawn => pawn_moves(pos, from, piece.color, &mut moves),
        PieceType::Knight => step_moves(&pos.board, from, piece.color, &KNIGHT_OFFSETS, &mut moves),
        PieceType::Bishop => ray_moves(&pos.board, from, piece.color, &BISHOP_DIRECTIONS, &mut moves),
        PieceType::Rook => ray_moves(&pos.board, from, piece.color, &ROOK_DIRECTIONS, &mut moves),
        PieceType::Queen => {
            ray_moves(&pos.board, from, piece.color, &BISHOP_DIRECTIONS, &mut moves);
            ray_moves(&pos.board, from, piece.color, &ROOK_DIRECTIONS, &mut moves);
        }
        PieceType::King => {
            step_moves(&pos.board, from, piece.color, &KING_OFFSETS, &mut moves);
            castle_moves(pos, from, piece.color, &mut moves);
        }
    }
    moves
}

fn pawn_moves(pos: &Position, from: Square, color: Color, moves: &mut Vec<Candidate>) {
    let board = &pos.board;
    let dir = color.forward();
    let tag = |mut c: Candidate| {
        if c.to.rank() == color.promotion_rank() {
            c.special = Some(SpecialMove::Promotion);
        }
        c
    };

    if let Some(one) = from.offset(0, dir) {
        if board.is_empty(one) {
            moves.push(tag(Candidate::quiet(from, one)));
            if from.rank() == color.pawn_start_rank() {
                if let Some(two) = from.offset(0, 2 * dir) {
                    if board.is_empty(two) {
                        moves.push(Candidate::quiet(from, two));
                    }
                }
            }
        }
    }

    for df in [-1, 1] {
        let Some(to) = from.offset(df, dir) else {
            continue;
        };
        match board.get(to) {
            Some(target) if target.color != color => moves.push(tag(Candidate::capture(from, to))),
            Some(_) => {}
            None if pos.en_passant == Some(to) => {
                let victim = Square::new(to.file(), from.rank()).and_then(|sq| board.get(sq));
                if victim == Some(Piece::new(PieceType::Pawn, color.opposite())) {
                    moves.push(Candidate {
                        from,
                        to,
                        capture: true,
                        special: Some(SpecialMove::EnPassant),
                    });
                }
            }
            None => {}
        }
    }
}

fn step_moves(
    board: &BoardState,
    from: Square,
    color: Color,
    offsets: &[(i8, i8)],
    moves: &mut Vec<Candidate>,
) {
    for &(df, dr) in offsets {
        let Some(to) = from.offset(df, dr) else {
            continue;
        };
        match board.get(to) {
            None => moves.push(Candidate::quiet(from, to)),
            Some(target) if target.color != color => moves.push(Candidate::capture(from, to)),
            Some(_) => {}
        }
    }
}

fn ray_moves(
    board: &BoardState,
    from: Square,
    color: Color,
    directions: &[(i8, i8)],
    moves: &mut Vec<Candidate>,
) {
    for &(df, dr) in directions {
        let mut cursor = from.offset(df, dr);
        while let Some(to) = cursor {
            match board.get(to) {
                None => moves.push(Candidate::quiet(from, to)),
                Some(target) => {
                    if target.color != color {
                        moves.push(Candidate::capture(from, to));
                    }
                    break;
                }
            }
            cursor = to.offset(df, dr);
        }
    }
}

/// Castling is offered when the king and the relevant rook are unmoved, the
/// rook is still on its corner, and every square strictly between king and
/// rook is empty. Whether the king passes through an attacked square is not
/// checked here.
fn castle_moves(pos: &Position, from: Square, color: Color, moves: &mut Vec<Candidate>) {
    let rank = color.back_rank();
    if from.rank() != rank || from.file() != 4 {
        return;
    }
    let rights = pos.castling.side(color);
    let rook = Some(Piece::new(PieceType::Rook, color));
    let empty = |files: &[u8]| files.iter().all(|&f| pos.board.is_empty(Square::at(f, rank)));

    for (side, allowed, between, king_file) in [
        (CastleSide::King, rights.can_castle_king_side(), &[5u8, 6][..], 6u8),
        (CastleSide::Queen, rights.can_castle_queen_side(), &[1u8, 2, 3][..], 2u8),
    ] {
        if !allowed || !empty(between) {
            continue;
        }
        let (rook_from, _) = side.rook_squares(color);
        if pos.board.get(rook_from) != rook {
            continue;
        }
        moves.push(Candidate {
            from,
            to: Square::at(king_file, rank),
            capture: false,
            special: Some(SpecialMove::Castle(side)),
        });
    }
}
