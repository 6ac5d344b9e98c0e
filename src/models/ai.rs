//! Optional computer opponent for one side.
//!
//! The host polls [`AiAssist::plan`] on the AI cadence; once a move is chosen
//! it waits out a short thinking delay and is handed back by
//! [`AiAssist::take_due`] so it can go through the normal commit path.

use log::{debug, info};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::time::{Duration, Instant};

use crate::config::MatchConfig;
use crate::game::board::{Color, Position, Square};
use crate::game::legality::all_legal_moves;
use crate::game::movegen::Candidate;
use crate::models::game_state::{Match, Phase};

/// Picks one move out of the legal candidates for the side to move.
pub trait MoveSelector {
    fn select(&mut self, pos: &Position, candidates: &[Candidate]) -> Option<Candidate>;
}

/// Highest-value capture first, cheapest capturer on ties. Without a capture,
/// a random move among the top quarter ranked by moving-piece value.
pub struct GreedySelector<R: Rng = ThreadRng> {
    rng: R,
}

impl GreedySelector<ThreadRng> {
    pub fn new() -> Self {
        GreedySelector { rng: thread_rng() }
    }
}

impl Default for GreedySelector<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> GreedySelector<R> {
    pub fn with_rng(rng: R) -> Self {
        GreedySelector { rng }
    }
}

fn mover_value(pos: &Position, c: &Candidate) -> u32 {
    pos.board.get(c.from).map_or(0, |p| p.kind.value())
}

fn capture_value(pos: &Position, c: &Candidate) -> Option<u32> {
    let square = c.captured_square()?;
    pos.board.get(square).map(|p| p.kind.value())
}

impl<R: Rng> MoveSelector for GreedySelector<R> {
    fn select(&mut self, pos: &Position, candidates: &[Candidate]) -> Option<Candidate> {
        let best_capture = candidates
            .iter()
            .filter_map(|c| capture_value(pos, c).map(|v| (v, mover_value(pos, c), *c)))
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        if let Some((_, _, capture)) = best_capture {
            return Some(capture);
        }

        let mut ranked = candidates.to_vec();
        ranked.sort_by_key(|c| std::cmp::Reverse(mover_value(pos, c)));
        let top = (ranked.len() / 4).max(1).min(ranked.len());
        ranked[..top].choose(&mut self.rng).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedMove {
    pub from: Square,
    pub to: Square,
    pub due: Instant,
}

/// Scheduling state for the AI side.
#[derive(Clone, Debug)]
pub struct AiAssist {
    enabled: bool,
    color: Color,
    planned: Option<PlannedMove>,
    think_base: Duration,
    think_jitter: Duration,
}

impl AiAssist {
    pub fn new(config: &MatchConfig) -> Self {
        AiAssist {
            enabled: false,
            color: Color::Black,
            planned: None,
            think_base: config.ai_think_base,
            think_jitter: config.ai_think_jitter,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// The side that auto-promotes, if any.
    pub fn controlled_side(&self) -> Option<Color> {
        self.enabled.then_some(self.color)
    }

    pub fn is_thinking(&self) -> bool {
        self.planned.is_some()
    }

    pub fn configure(&mut self, enabled: bool, color: Color) {
        if !enabled || color != self.color {
            self.planned = None;
        }
        self.enabled = enabled;
        self.color = color;
        info!("AI assist {} for {}", if enabled { "enabled" } else { "disabled" }, color);
    }

    /// Drops a planned move, e.g. after an undo or restart.
    pub fn cancel(&mut self) {
        self.planned = None;
    }

    /// Chooses a move when it is the AI side's turn and nothing is planned.
    pub fn plan(&mut self, game: &Match, selector: &mut dyn MoveSelector, now: Instant) -> Option<PlannedMove> {
        if !self.enabled || self.planned.is_some() {
            return None;
        }
        if game.phase() != Phase::Active || game.turn() != self.color {
            return None;
        }
        let candidates = all_legal_moves(game.position(), self.color);
        let choice = selector.select(game.position(), &candidates)?;
        let jitter = if self.think_jitter.is_zero() {
            Duration::ZERO
        } else {
            thread_rng().gen_range(Duration::ZERO..=self.think_jitter)
        };
        let planned = PlannedMove { from: choice.from, to: choice.to, due: now + self.think_base + jitter };
        debug!("AI plans {}{} out of {} candidates", choice.from, choice.to, candidates.len());
        self.planned = Some(planned);
        Some(planned)
    }

    /// Hands back the planned move once its thinking time has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<(Square, Square)> {
        match self.planned {
            Some(planned) if now >= planned.due => {
                self.planned = None;
                Some((planned.from, planned.to))
            }
            _ => None,
        }
    }
}
