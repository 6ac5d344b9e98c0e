use log::{debug, info, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::time::Instant;

use crate::errors::GameError;
use crate::game::attack::is_in_check;
use crate::game::board::{BoardState, Color, Piece, PieceType, Position, Square};
use crate::game::legality::{find_legal, has_legal_move, legal_moves_from};
use crate::game::movegen::{Candidate, SpecialMove};
use crate::game::utils::{game_status, material_scores};
use crate::models::clock::{ChessClock, ClockSnapshot};

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    /// `winner` is decided by material on the board; `None` is a draw.
    Timeout { expired: Color, winner: Option<Color> },
}

impl Outcome {
    pub fn winner(&self) -> Option<Color> {
        match self {
            Outcome::Checkmate { winner } => Some(*winner),
            Outcome::Stalemate => None,
            Outcome::Timeout { winner, .. } => *winner,
        }
    }

    /// Human-readable reason shown alongside the result.
    pub fn reason(&self, board: &BoardState) -> String {
        match self {
            Outcome::Checkmate { winner } => format!("checkmate, {winner} wins"),
            Outcome::Stalemate => "stalemate (draw)".to_string(),
            Outcome::Timeout { expired, winner } => {
                let scores = material_scores(board);
                let (w, b) = (scores[Color::White.index()], scores[Color::Black.index()]);
                match winner {
                    Some(winner) => format!(
                        "time out: {expired}'s clock reached 0; material white {w} vs black {b}, {winner} wins"
                    ),
                    None => format!(
                        "time out: {expired}'s clock reached 0; material is level at {w}, draw"
                    ),
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Active,
    /// A pawn reached its last rank and waits for a piece choice. The turn
    /// has already passed to the opponent, whose clock is running.
    PromotionPending { from: Square, square: Square, color: Color },
    Terminal(Outcome),
}

/// Pieces lost by each side, in capture order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedSets {
    white: Vec<Piece>,
    black: Vec<Piece>,
}

impl CapturedSets {
    pub fn push(&mut self, piece: Piece) {
        match piece.color {
            Color::White => self.white.push(piece),
            Color::Black => self.black.push(piece),
        }
    }

    /// Captured pieces of `color`.
    pub fn of(&self, color: Color) -> &[Piece] {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }
}

/// Snapshot pushed before every commit.
#[derive(Clone, Debug)]
pub struct MoveRecord {
    pub position: Position,
    pub captured: CapturedSets,
    pub clock: ClockSnapshot,
}

/// What a successful commit did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Committed {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub captured: Option<Piece>,
    pub special: Option<SpecialMove>,
    /// Set when the mover must still choose a promotion piece.
    pub promotion_pending: bool,
    pub promoted_to: Option<PieceType>,
    /// Whether the side now to move is in check.
    pub check: bool,
    pub outcome: Option<Outcome>,
}

/// Result of settling a pending promotion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromotionResolved {
    pub from: Square,
    pub square: Square,
    pub kind: PieceType,
    pub check: bool,
    pub outcome: Option<Outcome>,
}

/// One game: canonical position, clocks, history and phase.
#[derive(Clone, Debug)]
pub struct Match {
    position: Position,
    captured: CapturedSets,
    clock: ChessClock,
    phase: Phase,
    history: Vec<MoveRecord>,
    auto_promote: Option<Color>,
}

impl Match {
    /// A new game from the standard position with white's clock running.
    pub fn new(initial_clock_ms: u64, now: Instant) -> Self {
        Match::from_position(Position::standard(), initial_clock_ms, now)
    }

    pub fn from_position(position: Position, initial_clock_ms: u64, now: Instant) -> Self {
        let mut clock = ChessClock::new(initial_clock_ms);
        clock.start(position.turn, now);
        Match {
            position,
            captured: CapturedSets::default(),
            clock,
            phase: Phase::Active,
            history: Vec::new(),
            auto_promote: None,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn board(&self) -> &BoardState {
        &self.position.board
    }

    pub fn turn(&self) -> Color {
        self.position.turn
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Terminal(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, Phase::Terminal(_))
    }

    pub fn captured(&self) -> &CapturedSets {
        &self.captured
    }

    pub fn clock(&self) -> &ChessClock {
        &self.clock
    }

    pub fn clock_snapshot(&self) -> ClockSnapshot {
        self.clock.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn fen(&self) -> String {
        self.position.to_fen()
    }

    pub fn in_check(&self) -> bool {
        is_in_check(&self.position.board, self.position.turn)
    }

    pub fn status(&self) -> String {
        game_status(&self.phase, self.turn(), self.in_check())
    }

    /// Promote `color`'s pawns to queens without asking. Used for AI sides.
    pub fn set_auto_promotion(&mut self, color: Option<Color>) {
        self.auto_promote = color;
    }

    /// Legal destinations for the piece on `from`. Empty once the game ended.
    pub fn legal_moves_from(&self, from: Square) -> Vec<Candidate> {
        if self.is_terminal() {
            return Vec::new();
        }
        legal_moves_from(&self.position, from)
    }

    /// Plays `from -> to` for whichever piece stands on `from`. Turn
    /// ownership is enforced by the caller; an illegal move changes nothing.
    pub fn commit(&mut self, from: Square, to: Square, now: Instant) -> Result<Committed, GameError> {
        match self.phase {
            Phase::Terminal(_) => return Err(GameError::GameOver),
            Phase::PromotionPending { square, .. } => return Err(GameError::PromotionPending(square)),
            Phase::Active => {}
        }
        let piece = self.position.board.get(from).ok_or(GameError::NoPieceAt(from))?;
        let candidate = find_legal(&self.position, from, to).ok_or(GameError::IllegalMove { from, to })?;
        if piece.color != self.position.turn {
            warn!("Committing {} move {}{} on {}'s turn", piece.color, from, to, self.position.turn);
        }

        self.history.push(MoveRecord {
            position: self.position.clone(),
            captured: self.captured.clone(),
            clock: self.clock.snapshot(),
        });

        let pos = &mut self.position;
        let captured = candidate.apply_to(&mut pos.board);
        if let Some(taken) = captured {
            self.captured.push(taken);
        }

        pos.castling.vacate(from);
        if let Some(side) = candidate.castle_side() {
            pos.castling.vacate(side.rook_squares(piece.color).0);
        }
        if captured.is_some() && !candidate.is_en_passant() {
            pos.castling.vacate(to);
        }

        if piece.kind == PieceType::Pawn || captured.is_some() {
            pos.halfmove_clock = 0;
        } else {
            pos.halfmove_clock += 1;
        }

        pos.en_passant = if piece.kind == PieceType::Pawn && from.rank().abs_diff(to.rank()) == 2 {
            Square::new(from.file(), (from.rank() + to.rank()) / 2)
        } else {
            None
        };

        log_commit(piece, &candidate, captured);

        let mut promoted_to = None;
        let mut promotion_pending = false;
        if candidate.is_promotion() {
            if self.auto_promote == Some(piece.color) {
                pos.board.set(to, Some(Piece::new(PieceType::Queen, piece.color)));
                promoted_to = Some(PieceType::Queen);
                info!("Pawn auto-promoted to queen at {}", to);
            } else {
                self.phase = Phase::PromotionPending { from, square: to, color: piece.color };
                promotion_pending = true;
            }
        }

        self.pass_turn(now);
        let outcome = if promotion_pending { None } else { self.settle() };
        Ok(Committed {
            from,
            to,
            piece,
            captured,
            special: candidate.special,
            promotion_pending,
            promoted_to,
            check: self.in_check(),
            outcome,
        })
    }

    /// Settles a pending promotion with `kind`.
    pub fn resolve_promotion(&mut self, kind: PieceType) -> Result<PromotionResolved, GameError> {
        let Phase::PromotionPending { from, square, color } = self.phase else {
            return Err(GameError::NoPromotionPending);
        };
        if !kind.is_promotion_choice() {
            return Err(GameError::InvalidPromotion(kind.name().to_string()));
        }
        self.position.board.set(square, Some(Piece::new(kind, color)));
        self.phase = Phase::Active;
        info!("Pawn promoted to {} at {}", kind.name(), square);
        let outcome = self.settle();
        Ok(PromotionResolved { from, square, kind, check: self.in_check(), outcome })
    }

    /// Forces the piece on `square` to `kind` after a commit whose promotion
    /// was already chosen elsewhere. A pending prompt on that square is
    /// resolved without being shown.
    pub fn force_promotion(&mut self, square: Square, kind: PieceType) -> Result<Option<Outcome>, GameError> {
        if !kind.is_promotion_choice() {
            return Err(GameError::InvalidPromotion(kind.name().to_string()));
        }
        match self.phase {
            Phase::PromotionPending { square: pending, .. } if pending == square => {
                Ok(self.resolve_promotion(kind)?.outcome)
            }
            _ => {
                let piece = self.position.board.get(square).ok_or(GameError::NoPieceAt(square))?;
                self.position.board.set(square, Some(Piece::new(kind, piece.color)));
                debug!("Forced {} on {} to {}", piece, square, kind.name());
                Ok(None)
            }
        }
    }

    /// Advances the running clock. Returns the outcome when it just expired.
    pub fn tick(&mut self, now: Instant) -> Option<Outcome> {
        if self.is_terminal() {
            return None;
        }
        let expired = self.clock.tick(now)?;
        let outcome = self.timeout_outcome(expired);
        info!("{}'s clock expired: {:?}", expired, outcome);
        self.phase = Phase::Terminal(outcome);
        Some(outcome)
    }

    /// Restores the state before the most recent commit, clocks included,
    /// and resumes the restored running side (or the side to move).
    pub fn undo(&mut self, now: Instant) -> Result<(), GameError> {
        let record = self.history.pop().ok_or(GameError::NothingToUndo)?;
        self.position = record.position;
        self.captured = record.captured;
        self.phase = Phase::Active;
        self.clock.restore(&record.clock, now);
        if record.clock.running.is_none() {
            self.clock.start(self.position.turn, now);
        }
        info!("Undo performed, {} to move", self.position.turn);
        Ok(())
    }

    /// Overwrites the clocks with a snapshot received from a peer.
    pub fn sync_clock(&mut self, snapshot: &ClockSnapshot, now: Instant) {
        if self.is_terminal() {
            return;
        }
        self.clock.restore(snapshot, now);
    }

    fn pass_turn(&mut self, now: Instant) {
        let pos = &mut self.position;
        pos.turn = pos.turn.opposite();
        if pos.turn == Color::White {
            pos.move_number += 1;
        }
        self.clock.start(pos.turn, now);
    }

    /// Ends the game when the side to move has no legal move.
    fn settle(&mut self) -> Option<Outcome> {
        let turn = self.position.turn;
        if has_legal_move(&self.position, turn) {
            if self.in_check() {
                info!("{} is in check", turn);
            }
            return None;
        }
        let outcome = if self.in_check() {
            Outcome::Checkmate { winner: turn.opposite() }
        } else {
            Outcome::Stalemate
        };
        info!("Game over: {:?}", outcome);
        self.clock.stop();
        self.phase = Phase::Terminal(outcome);
        Some(outcome)
    }

    fn timeout_outcome(&self, expired: Color) -> Outcome {
        let scores = material_scores(&self.position.board);
        let other = expired.opposite();
        let winner = match scores[other.index()].cmp(&scores[expired.index()]) {
            Ordering::Greater => Some(other),
            Ordering::Less => Some(expired),
            Ordering::Equal => None,
        };
        Outcome::Timeout { expired, winner }
    }
}

fn log_commit(piece: Piece, candidate: &Candidate, captured: Option<Piece>) {
    match captured {
        Some(taken) if candidate.is_en_passant() => {
            info!("{} pawn captured {} en passant at {}", piece.color, taken, candidate.to)
        }
        Some(taken) => info!("{} captured {} at {}", piece, taken, candidate.to),
        None => info!("{} moved to {}", piece, candidate.to),
    }
}
