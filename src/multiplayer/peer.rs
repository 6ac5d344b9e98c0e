//! One peer's game host. Every input (UI clicks, clock ticks, AI polls,
//! relay traffic) arrives as a [`PeerEvent`] and is handled to completion
//! before the next one, so the game state has a single writer.

use log::{debug, info, warn};
use std::time::{Duration, Instant};

use crate::config::MatchConfig;
use crate::errors::{GameError, SyncError};
use crate::game::board::{Color, PieceType, Position, Square};
use crate::game::movegen::Candidate;
use crate::models::ai::{AiAssist, GreedySelector, MoveSelector};
use crate::models::game_state::{Committed, Match, Outcome, Phase};
use crate::models::messages::RelayMessage;
use crate::multiplayer::session::generate_local_id;
use crate::multiplayer::sync::{MultiplayerSync, RelayLink, SyncEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerEvent {
    Select(Square),
    Move { from: Square, to: Square },
    Promote(PieceType),
    Undo,
    Restart,
    Tick,
    AiPoll,
    SetAi { enabled: bool, color: Color },
    Register,
    Connect(String),
    Disconnect,
    /// Raw text from the relay socket.
    Inbound(String),
}

/// What the UI should show after an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Destinations { from: Square, moves: Vec<Candidate> },
    Committed(Committed),
    PromotionPrompt { square: Square, color: Color },
    Promoted { square: Square, kind: PieceType },
    Check(Color),
    GameOver { winner: Option<Color>, reason: String },
    Undone,
    Restarted,
    Sync(SyncEvent),
    Rejected(String),
}

pub struct PeerGame<L: RelayLink> {
    config: MatchConfig,
    game: Match,
    sync: MultiplayerSync<L>,
    ai: AiAssist,
    selector: Box<dyn MoveSelector>,
}

impl<L: RelayLink> PeerGame<L> {
    /// A fresh game under a newly generated local id.
    pub fn new(config: MatchConfig, link: L, now: Instant) -> Self {
        Self::with_id(config, &generate_local_id(), link, now)
    }

    pub fn with_id(config: MatchConfig, local_id: &str, link: L, now: Instant) -> Self {
        Self::with_position(config, local_id, link, Position::standard(), now)
    }

    /// Starts from an arbitrary position instead of the initial one.
    pub fn with_position(config: MatchConfig, local_id: &str, link: L, position: Position, now: Instant) -> Self {
        PeerGame {
            game: Match::from_position(position, config.initial_clock_ms, now),
            sync: MultiplayerSync::new(local_id, link),
            ai: AiAssist::new(&config),
            selector: Box::new(GreedySelector::new()),
            config,
        }
    }

    pub fn with_selector(mut self, selector: Box<dyn MoveSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn game(&self) -> &Match {
        &self.game
    }

    pub fn sync(&self) -> &MultiplayerSync<L> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut MultiplayerSync<L> {
        &mut self.sync
    }

    pub fn ai(&self) -> &AiAssist {
        &self.ai
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// A timer schedule for this game's `Tick` and `AiPoll` events.
    pub fn cadence(&self, now: Instant) -> Cadence {
        Cadence::new(&self.config, now)
    }

    pub fn handle(&mut self, event: PeerEvent, now: Instant) -> Vec<Notification> {
        match event {
            PeerEvent::Select(square) => self.select(square),
            PeerEvent::Move { from, to } => self.play(from, to, now),
            PeerEvent::Promote(kind) => self.promote(kind),
            PeerEvent::Undo => self.undo(now),
            PeerEvent::Restart => self.restart(now),
            PeerEvent::Tick => self.tick(now),
            PeerEvent::AiPoll => {
                self.ai.plan(&self.game, self.selector.as_mut(), now);
                Vec::new()
            }
            PeerEvent::SetAi { enabled, color } => {
                self.ai.configure(enabled, color);
                self.game.set_auto_promotion(self.ai.controlled_side());
                Vec::new()
            }
            PeerEvent::Register => {
                self.sync.register();
                Vec::new()
            }
            PeerEvent::Connect(peer) => match self.sync.connect(&peer) {
                Ok(()) => Vec::new(),
                Err(e) => vec![rejected(e)],
            },
            PeerEvent::Disconnect => match self.sync.disconnect() {
                Ok(()) => Vec::new(),
                Err(e) => vec![rejected(e)],
            },
            PeerEvent::Inbound(text) => self.inbound(&text, now),
        }
    }

    /// Legal destinations for `from`, after the turn and ownership checks.
    pub fn select(&mut self, from: Square) -> Vec<Notification> {
        if let Some(reason) = self.selection_error(from) {
            return vec![Notification::Rejected(reason)];
        }
        let moves = self.game.legal_moves_from(from);
        vec![Notification::Destinations { from, moves }]
    }

    fn selection_error(&self, from: Square) -> Option<String> {
        if self.game.is_terminal() {
            return Some(GameError::GameOver.to_string());
        }
        if let Phase::PromotionPending { square, .. } = self.game.phase() {
            return Some(GameError::PromotionPending(square).to_string());
        }
        if let Err(e) = self.sync.check_selectable(&self.game, from) {
            return Some(e.to_string());
        }
        match self.game.board().get(from) {
            None => Some(GameError::NoPieceAt(from).to_string()),
            Some(piece) if piece.color != self.game.turn() => Some(SyncError::NotYourTurn.to_string()),
            Some(_) => None,
        }
    }

    fn play(&mut self, from: Square, to: Square, now: Instant) -> Vec<Notification> {
        if let Some(reason) = self.selection_error(from) {
            return vec![Notification::Rejected(reason)];
        }
        self.commit(from, to, now)
    }

    fn commit(&mut self, from: Square, to: Square, now: Instant) -> Vec<Notification> {
        match self.sync.commit_local(&mut self.game, from, to, now) {
            Ok(committed) => self.after_commit(committed),
            Err(e) => vec![rejected(e)],
        }
    }

    fn after_commit(&mut self, committed: Committed) -> Vec<Notification> {
        self.ai.cancel();
        let mut out = Vec::new();
        let pending = committed.promotion_pending;
        let (to, mover) = (committed.to, committed.piece.color);
        let (check, outcome) = (committed.check, committed.outcome);
        out.push(Notification::Committed(committed));
        if pending {
            out.push(Notification::PromotionPrompt { square: to, color: mover });
        } else {
            self.push_state(&mut out, check, outcome);
        }
        out
    }

    fn push_state(&self, out: &mut Vec<Notification>, check: bool, outcome: Option<Outcome>) {
        match outcome {
            Some(outcome) => out.push(game_over(&self.game, outcome)),
            None if check => out.push(Notification::Check(self.game.turn())),
            None => {}
        }
    }

    fn promote(&mut self, kind: PieceType) -> Vec<Notification> {
        match self.sync.resolve_promotion(&mut self.game, kind) {
            Ok(resolved) => {
                let mut out = vec![Notification::Promoted { square: resolved.square, kind }];
                self.push_state(&mut out, resolved.check, resolved.outcome);
                out
            }
            Err(e) => vec![rejected(e)],
        }
    }

    fn undo(&mut self, now: Instant) -> Vec<Notification> {
        match self.game.undo(now) {
            Ok(()) => {
                self.ai.cancel();
                vec![Notification::Undone]
            }
            Err(e) => vec![rejected(e)],
        }
    }

    fn restart(&mut self, now: Instant) -> Vec<Notification> {
        self.game = Match::new(self.config.initial_clock_ms, now);
        self.game.set_auto_promotion(self.ai.controlled_side());
        self.ai.cancel();
        info!("New game started");
        vec![Notification::Restarted]
    }

    fn tick(&mut self, now: Instant) -> Vec<Notification> {
        if let Some(outcome) = self.game.tick(now) {
            self.ai.cancel();
            return vec![game_over(&self.game, outcome)];
        }
        match self.ai.take_due(now) {
            Some((from, to)) if self.ai_may_play(from) => {
                debug!("AI commits {}{}", from, to);
                self.commit(from, to, now)
            }
            Some((from, to)) => {
                debug!("Dropping stale AI move {}{}", from, to);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// A planned move only stands while the AI side is still to move.
    fn ai_may_play(&self, from: Square) -> bool {
        let turn = self.game.turn();
        self.game.phase() == Phase::Active
            && turn == self.ai.color()
            && self.game.board().get(from).map(|p| p.color) == Some(turn)
    }

    fn inbound(&mut self, text: &str, now: Instant) -> Vec<Notification> {
        let msg = match RelayMessage::from_json(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Discarding malformed relay message: {}", e);
                return Vec::new();
            }
        };
        let Some(event) = self.sync.handle_inbound(msg, &mut self.game, now) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        if let SyncEvent::RemoteMove { committed, outcome, .. } = &event {
            let check = self.game.in_check();
            self.ai.cancel();
            out.push(Notification::Committed(committed.clone()));
            self.push_state(&mut out, check && outcome.is_none(), *outcome);
        }
        out.push(Notification::Sync(event));
        out
    }
}

/// Produces the periodic `Tick` and `AiPoll` events a host feeds into
/// [`PeerGame::handle`], spaced by the intervals in [`MatchConfig`].
#[derive(Clone, Debug)]
pub struct Cadence {
    tick_interval: Duration,
    poll_interval: Duration,
    next_tick: Instant,
    next_poll: Instant,
}

impl Cadence {
    pub fn new(config: &MatchConfig, now: Instant) -> Self {
        Cadence {
            tick_interval: config.tick_interval,
            poll_interval: config.ai_poll_interval,
            next_tick: now + config.tick_interval,
            next_poll: now + config.ai_poll_interval,
        }
    }

    /// Events that fell due by `now`. A late host gets each kind at most
    /// once; missed periods are not replayed.
    pub fn due(&mut self, now: Instant) -> Vec<PeerEvent> {
        let mut events = Vec::new();
        if now >= self.next_tick {
            self.next_tick = now + self.tick_interval;
            events.push(PeerEvent::Tick);
        }
        if now >= self.next_poll {
            self.next_poll = now + self.poll_interval;
            events.push(PeerEvent::AiPoll);
        }
        events
    }

    /// When the host should wake up next.
    pub fn next_wakeup(&self) -> Instant {
        self.next_tick.min(self.next_poll)
    }
}

fn rejected<E: std::fmt::Display>(e: E) -> Notification {
    Notification::Rejected(e.to_string())
}

fn game_over(game: &Match, outcome: Outcome) -> Notification {
    Notification::GameOver {
        winner: outcome.winner(),
        reason: outcome.reason(game.board()),
    }
}
