use thiserror::Error;

use crate::game::board::Square;

/// Rule-level failures. A failed operation never changes game state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("no piece on {0}")]
    NoPieceAt(Square),

    #[error("illegal move: {from} -> {to}")]
    IllegalMove { from: Square, to: Square },

    #[error("game is already over")]
    GameOver,

    #[error("a promotion choice is pending on {0}")]
    PromotionPending(Square),

    #[error("no promotion is pending")]
    NoPromotionPending,

    #[error("invalid promotion piece: {0}")]
    InvalidPromotion(String),

    #[error("invalid square notation: {0}")]
    InvalidSquare(String),

    #[error("invalid FEN string: {0}")]
    InvalidFen(String),

    #[error("no moves to undo")]
    NothingToUndo,
}

/// Misuse of the multiplayer API by the local UI.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("enter a peer id first")]
    EmptyPeerId,

    #[error("cannot connect to your own id")]
    SelfConnect,

    #[error("not connected to a peer")]
    NotConnected,

    #[error("it's the opponent's turn")]
    NotYourTurn,

    #[error("opponent piece cannot be selected")]
    NotYourPiece,
}
