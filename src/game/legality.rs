//! Legal move filtering by full-board simulation.
//!
//! Every pseudo-legal candidate is played on a cloned board (including the
//! castling rook and the en passant victim) and rejected when the mover's king
//! is attacked afterwards. No pin tracking is attempted.

use crate::game::attack::is_square_attacked;
use crate::game::board::{Color, Position, Square};
use crate::game::movegen::{pseudo_legal_moves, Candidate};

/// Whether `candidate` leaves its mover's king safe. A mover without a king
/// on the resulting board has no legal moves.
pub fn is_legal(pos: &Position, candidate: &Candidate) -> bool {
    let Some(mover) = pos.board.get(candidate.from) else {
        return false;
    };
    let mut board = pos.board.clone();
    candidate.apply_to(&mut board);
    match board.find_king(mover.color) {
        Some(king) => !is_square_attacked(&board, king, mover.color.opposite()),
        None => false,
    }
}

/// Legal moves for the piece on `from`, regardless of whose turn it is.
pub fn legal_moves_from(pos: &Position, from: Square) -> Vec<Candidate> {
    pseudo_legal_moves(pos, from)
        .into_iter()
        .filter(|c| is_legal(pos, c))
        .collect()
}

/// Every legal move available to `color`.
pub fn all_legal_moves(pos: &Position, color: Color) -> Vec<Candidate> {
    pos.board
        .pieces_of(color)
        .flat_map(|(sq, _)| legal_moves_from(pos, sq))
        .collect()
}

pub fn has_legal_move(pos: &Position, color: Color) -> bool {
    pos.board
        .pieces_of(color)
        .any(|(sq, _)| pseudo_legal_moves(pos, sq).iter().any(|c| is_legal(pos, c)))
}

/// Finds the legal candidate `from -> to`, if there is one.
pub fn find_legal(pos: &Position, from: Square, to: Square) -> Option<Candidate> {
    pseudo_legal_moves(pos, from)
        .into_iter()
        .find(|c| c.to == to && is_legal(pos, c))
}
