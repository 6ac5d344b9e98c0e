pub mod attack;
pub mod board;
pub mod legality;
pub mod movegen;
pub mod utils;

// Re-export important types
pub use board::{BoardState, CastlingRights, Color, Piece, PieceType, Position, SideCastling, Square};
pub use movegen::{Candidate, CastleSide, SpecialMove};
