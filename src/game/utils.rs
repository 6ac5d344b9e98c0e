use crate::game::board::{BoardState, Color};
use crate::models::game_state::{Outcome, Phase};

/// Summed material points per side, indexed by `Color::index()`.
pub fn material_scores(board: &BoardState) -> [u32; 2] {
    let mut scores = [0; 2];
    for (_, piece) in board.pieces() {
        scores[piece.color.index()] += piece.kind.material();
    }
    scores
}

/// Get the game status as a string
pub fn game_status(phase: &Phase, turn: Color, in_check: bool) -> String {
    match phase {
        Phase::Terminal(Outcome::Checkmate { winner }) => format!("{}_wins", winner.name()),
        Phase::Terminal(Outcome::Stalemate) => "stalemate".to_string(),
        Phase::Terminal(Outcome::Timeout { winner: Some(winner), .. }) => {
            format!("{}_wins_on_time", winner.name())
        }
        Phase::Terminal(Outcome::Timeout { winner: None, .. }) => "draw".to_string(),
        Phase::PromotionPending { .. } => "promotion_pending".to_string(),
        Phase::Active if in_check => "check".to_string(),
        Phase::Active => format!("{}_turn", turn.name()),
    }
}

/// Formats remaining clock time as `mm:ss`.
pub fn format_clock(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
