use crate::game::board::{BoardState, Color, PieceType, Square};
use crate::game::movegen::{BISHOP_DIRECTIONS, KING_OFFSETS, KNIGHT_OFFSETS, ROOK_DIRECTIONS};

/// Whether any piece of `by` could capture on `target`.
///
/// Pawns attack diagonally forward from their own point of view, sliders stop
/// at the first occupied square.
pub fn is_square_attacked(board: &BoardState, target: Square, by: Color) -> bool {
    let holds = |sq: Option<Square>, kinds: &[PieceType]| {
        sq.and_then(|sq| board.get(sq))
            .is_some_and(|p| p.color == by && kinds.contains(&p.kind))
    };

    // An attacking pawn sits one rank behind the target from its own side.
    let pawn_rank = -by.forward();
    if [-1, 1]
        .iter()
        .any(|&df| holds(target.offset(df, pawn_rank), &[PieceType::Pawn]))
    {
        return true;
    }

    if KNIGHT_OFFSETS
        .iter()
        .any(|&(df, dr)| holds(target.offset(df, dr), &[PieceType::Knight]))
    {
        return true;
    }

    if KING_OFFSETS
        .iter()
        .any(|&(df, dr)| holds(target.offset(df, dr), &[PieceType::King]))
    {
        return true;
    }

    let slides = |directions: &[(i8, i8)], kinds: &[PieceType]| {
        directions.iter().any(|&(df, dr)| {
            let mut cursor = target.offset(df, dr);
            while let Some(sq) = cursor {
                if board.get(sq).is_some() {
                    return holds(Some(sq), kinds);
                }
                cursor = sq.offset(df, dr);
            }
            false
        })
    };

    slides(&BISHOP_DIRECTIONS, &[PieceType::Bishop, PieceType::Queen])
        || slides(&ROOK_DIRECTIONS, &[PieceType::Rook, PieceType::Queen])
}

/// Whether `color`'s king is currently attacked. A side without a king is
/// never in check.
pub fn is_in_check(board: &BoardState, color: Color) -> bool {
    board
        .find_king(color)
        .is_some_and(|king| is_square_attacked(board, king, color.opposite()))
}
