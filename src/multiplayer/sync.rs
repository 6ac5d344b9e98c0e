//! Keeps two peers' games in step by exchanging committed moves and clock
//! snapshots through the relay. Every peer validates moves locally; nothing
//! on the relay side knows the rules.

use log::{debug, info, warn};
use std::time::Instant;

use crate::errors::{GameError, SyncError};
use crate::game::board::{Color, PieceType, Square};
use crate::models::clock::ClockSnapshot;
use crate::models::game_state::{Committed, Match, Outcome, PromotionResolved};
use crate::models::messages::RelayMessage;
use crate::multiplayer::session::{room_name, ConnectionState, MultiplayerSession};

/// Outbound half of the relay connection.
pub trait RelayLink {
    fn send(&mut self, message: RelayMessage);
}

/// Buffers outbound messages; the host drains it onto the real transport.
impl RelayLink for Vec<RelayMessage> {
    fn send(&mut self, message: RelayMessage) {
        self.push(message);
    }
}

/// What an inbound relay message did, for the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    Registered { id: String },
    RequestSent { to: String },
    RequestRejected { to: String, reason: String },
    Connected { peer: String, room: String, color: Color },
    PeerLeft { peer: String },
    ClockSynced(ClockSnapshot),
    RemoteMove {
        committed: Committed,
        promoted_to: Option<PieceType>,
        outcome: Option<Outcome>,
    },
}

pub struct MultiplayerSync<L: RelayLink> {
    local_id: String,
    link: L,
    state: ConnectionState,
    session: Option<MultiplayerSession>,
    applying_remote: bool,
}

impl<L: RelayLink> MultiplayerSync<L> {
    pub fn new(local_id: &str, link: L) -> Self {
        MultiplayerSync {
            local_id: local_id.trim().to_uppercase(),
            link,
            state: ConnectionState::Offline,
            session: None,
            applying_remote: false,
        }
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn session(&self) -> Option<&MultiplayerSession> {
        self.session.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// The locally owned color while connected.
    pub fn local_color(&self) -> Option<Color> {
        self.session.as_ref().map(|s| s.color)
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Announces the local id to the relay.
    pub fn register(&mut self) {
        self.link.send(RelayMessage::register(&self.local_id));
    }

    pub fn connect(&mut self, peer_id: &str) -> Result<(), SyncError> {
        let peer = peer_id.trim().to_uppercase();
        if peer.is_empty() {
            return Err(SyncError::EmptyPeerId);
        }
        if peer == self.local_id {
            return Err(SyncError::SelfConnect);
        }
        info!("Requesting a game with {}", peer);
        self.link.send(RelayMessage::request(&self.local_id, &peer));
        self.state = ConnectionState::Requesting { peer };
        Ok(())
    }

    /// Leaves the room and drops the session.
    pub fn disconnect(&mut self) -> Result<(), SyncError> {
        let session = self.session.take().ok_or(SyncError::NotConnected)?;
        self.link.send(RelayMessage::leave(&session.room, &self.local_id));
        self.state = ConnectionState::Offline;
        info!("Left room {}", session.room);
        Ok(())
    }

    /// Selection boundary: while connected only the local color's pieces may
    /// be picked, and only on its turn.
    pub fn check_selectable(&self, game: &Match, square: Square) -> Result<(), SyncError> {
        let Some(color) = self.local_color() else {
            return Ok(());
        };
        if game.turn() != color {
            return Err(SyncError::NotYourTurn);
        }
        match game.board().get(square) {
            Some(piece) if piece.color != color => Err(SyncError::NotYourPiece),
            _ => Ok(()),
        }
    }

    /// Commits a move and tells the peer, unless a promotion choice is
    /// still open (it goes out once resolved).
    pub fn commit_local(
        &mut self,
        game: &mut Match,
        from: Square,
        to: Square,
        now: Instant,
    ) -> Result<Committed, GameError> {
        let committed = game.commit(from, to, now)?;
        if !committed.promotion_pending {
            let promotion = committed.promoted_to.map(|k| k.to_char().to_string());
            self.emit_move(game, from, to, promotion.as_deref());
        }
        Ok(committed)
    }

    pub fn resolve_promotion(&mut self, game: &mut Match, kind: PieceType) -> Result<PromotionResolved, GameError> {
        let resolved = game.resolve_promotion(kind)?;
        let promotion = kind.to_char().to_string();
        self.emit_move(game, resolved.from, resolved.square, Some(&promotion));
        Ok(resolved)
    }

    fn emit_move(&mut self, game: &Match, from: Square, to: Square, promotion: Option<&str>) {
        if self.applying_remote {
            return;
        }
        let Some(session) = &self.session else {
            return;
        };
        let msg = RelayMessage::chess_move(
            &session.room,
            &from.to_algebraic(),
            &to.to_algebraic(),
            promotion,
            game.clock_snapshot(),
        );
        self.link.send(msg);
    }

    /// Handles one inbound relay message. Anything malformed or addressed
    /// elsewhere is logged and dropped.
    pub fn handle_inbound(&mut self, msg: RelayMessage, game: &mut Match, now: Instant) -> Option<SyncEvent> {
        match msg.message_type.as_str() {
            "registered" => Some(SyncEvent::Registered {
                id: msg.id.unwrap_or_else(|| self.local_id.clone()),
            }),
            "request_sent" => Some(SyncEvent::RequestSent { to: msg.to.unwrap_or_default() }),
            "request_rejected" => {
                self.state = ConnectionState::Offline;
                Some(SyncEvent::RequestRejected {
                    to: msg.to.unwrap_or_default(),
                    reason: msg.reason.unwrap_or_default(),
                })
            }
            "request" => self.handle_request(msg, game),
            "accepted" => self.handle_accepted(msg, game),
            "move" => self.apply_remote(msg, game, now),
            "sync" => self.handle_sync(msg, game, now),
            "left" => self.handle_left(msg),
            "joined" => {
                debug!("{:?} joined {:?}", msg.id, msg.room);
                None
            }
            other => {
                debug!("Ignoring relay message {}", other);
                None
            }
        }
    }

    fn handle_request(&mut self, msg: RelayMessage, game: &Match) -> Option<SyncEvent> {
        let to = msg.to?.to_uppercase();
        let from = msg.from?.trim().to_uppercase();
        if to != self.local_id || from.is_empty() || from == self.local_id {
            warn!("Dropping request {} -> {}", from, to);
            return None;
        }
        if let Some(current) = &self.session {
            info!("Request from {} replaces the session with {} in room {}", from, current.peer_id, current.room);
        }
        let room = room_name(&self.local_id, &from);
        self.link.send(RelayMessage::accept(&self.local_id, &from, &room));
        Some(self.finalize(&from, &room, game))
    }

    fn handle_accepted(&mut self, msg: RelayMessage, game: &Match) -> Option<SyncEvent> {
        let peer = msg.from?.trim().to_uppercase();
        if msg.to.as_deref().map(str::to_uppercase).as_deref() != Some(self.local_id.as_str()) {
            warn!("Dropping accept from {} addressed elsewhere", peer);
            return None;
        }
        let room = msg.room.unwrap_or_else(|| room_name(&self.local_id, &peer));
        Some(self.finalize(&peer, &room, game))
    }

    fn finalize(&mut self, peer: &str, room: &str, game: &Match) -> SyncEvent {
        let session = MultiplayerSession::new(&self.local_id, peer).with_room(room);
        info!("Connected with {} in room {} playing {}", peer, room, session.color);
        self.link.send(RelayMessage::join(room, &self.local_id));
        self.link.send(RelayMessage::sync(room, &self.local_id, game.clock_snapshot()));
        let event = SyncEvent::Connected {
            peer: peer.to_string(),
            room: room.to_string(),
            color: session.color,
        };
        self.session = Some(session);
        self.state = ConnectionState::Connected;
        event
    }

    fn in_session_room(&self, room: Option<&str>) -> bool {
        match (&self.session, room) {
            (Some(session), Some(room)) => session.room == room,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn handle_sync(&mut self, msg: RelayMessage, game: &mut Match, now: Instant) -> Option<SyncEvent> {
        if !self.in_session_room(msg.room.as_deref()) {
            debug!("Dropping sync for room {:?}", msg.room);
            return None;
        }
        let clock = msg.clock?;
        game.sync_clock(&clock, now);
        Some(SyncEvent::ClockSynced(clock))
    }

    fn handle_left(&mut self, msg: RelayMessage) -> Option<SyncEvent> {
        let session = self.session.as_ref()?;
        let id = msg.id?.to_uppercase();
        if id != session.peer_id || !self.in_session_room(msg.room.as_deref()) {
            return None;
        }
        info!("Peer {} left room {}", id, session.room);
        self.session = None;
        self.state = ConnectionState::Offline;
        Some(SyncEvent::PeerLeft { peer: id })
    }

    /// Replays a peer's move through the same commit path as local input,
    /// with emission suppressed.
    fn apply_remote(&mut self, msg: RelayMessage, game: &mut Match, now: Instant) -> Option<SyncEvent> {
        if !self.in_session_room(msg.room.as_deref()) {
            debug!("Dropping move for room {:?}", msg.room);
            return None;
        }
        let from = msg.move_from.as_deref().and_then(Square::from_algebraic);
        let to = msg.move_to.as_deref().and_then(Square::from_algebraic);
        let (Some(from), Some(to)) = (from, to) else {
            warn!("Dropping move with bad squares {:?} -> {:?}", msg.move_from, msg.move_to);
            return None;
        };

        self.applying_remote = true;
        let result = self.replay(game, from, to, msg.promotion.as_deref(), msg.clock, now);
        self.applying_remote = false;

        match result {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Dropping remote move {}{}: {}", from, to, e);
                None
            }
        }
    }

    fn replay(
        &mut self,
        game: &mut Match,
        from: Square,
        to: Square,
        promotion: Option<&str>,
        clock: Option<ClockSnapshot>,
        now: Instant,
    ) -> Result<SyncEvent, GameError> {
        let before = game.clock_snapshot();
        if let Some(clock) = &clock {
            game.sync_clock(clock, now);
        }
        let committed = match self.commit_local(game, from, to, now) {
            Ok(committed) => committed,
            Err(e) => {
                game.sync_clock(&before, now);
                return Err(e);
            }
        };

        let chosen = match promotion {
            Some(p) => match PieceType::promotion_from_str(p) {
                Some(kind) => Some(kind),
                None => {
                    warn!("Ignoring unknown promotion {:?}", p);
                    None
                }
            },
            None => None,
        };
        let mut promoted_to = committed.promoted_to;
        let mut outcome = committed.outcome;
        if committed.promotion_pending || promoted_to.is_some() {
            // The peer already chose; a remote promotion never prompts here.
            let kind = chosen.unwrap_or(PieceType::Queen);
            outcome = game.force_promotion(to, kind)?.or(outcome);
            promoted_to = Some(kind);
        }
        Ok(SyncEvent::RemoteMove { committed, promoted_to, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Piece, Position};

    fn sq(name: &str) -> Square {
        Square::from_algebraic(name).unwrap()
    }

    fn connected(local: &str, peer: &str, game: &mut Match, now: Instant) -> MultiplayerSync<Vec<RelayMessage>> {
        let mut sync = MultiplayerSync::new(local, Vec::new());
        let accepted = RelayMessage::accepted(peer, local, &room_name(local, peer));
        sync.handle_inbound(accepted, game, now).unwrap();
        sync.link_mut().clear();
        sync
    }

    #[test]
    fn connect_validates_peer_id() {
        let mut sync = MultiplayerSync::new("abcdef", Vec::new());
        assert_eq!(sync.connect("  "), Err(SyncError::EmptyPeerId));
        assert_eq!(sync.connect("ABCDEF"), Err(SyncError::SelfConnect));
        assert!(sync.connect("zzzzzz").is_ok());
        assert_eq!(sync.link(), &vec![RelayMessage::request("ABCDEF", "ZZZZZZ")]);
        assert_eq!(sync.state(), &ConnectionState::Requesting { peer: "ZZZZZZ".to_string() });
        assert_eq!(sync.disconnect(), Err(SyncError::NotConnected));
    }

    #[test]
    fn incoming_request_is_auto_accepted() {
        let t0 = Instant::now();
        let mut game = Match::new(600_000, t0);
        let mut sync = MultiplayerSync::new("ZZZZZZ", Vec::new());
        let event = sync.handle_inbound(RelayMessage::request("AAAAAA", "ZZZZZZ"), &mut game, t0);
        assert_eq!(
            event,
            Some(SyncEvent::Connected {
                peer: "AAAAAA".to_string(),
                room: "AAAAAA-ZZZZZZ".to_string(),
                color: Color::Black,
            })
        );
        let types: Vec<&str> = sync.link().iter().map(|m| m.message_type.as_str()).collect();
        assert_eq!(types, vec!["accept", "join", "sync"]);
    }

    #[test]
    fn local_commit_is_emitted_with_clock() {
        let t0 = Instant::now();
        let mut game = Match::new(600_000, t0);
        let mut sync = connected("AAAAAA", "ZZZZZZ", &mut game, t0);
        sync.commit_local(&mut game, sq("e2"), sq("e4"), t0).unwrap();
        let sent = &sync.link()[0];
        assert_eq!(sent.message_type, "move");
        assert_eq!(sent.move_from.as_deref(), Some("e2"));
        assert_eq!(sent.clock.unwrap().running, Some(Color::Black));
    }

    #[test]
    fn remote_move_is_not_echoed() {
        let t0 = Instant::now();
        let mut game = Match::new(600_000, t0);
        let mut sync = connected("ZZZZZZ", "AAAAAA", &mut game, t0);
        let clock = ClockSnapshot { white_ms: 590_000, black_ms: 600_000, running: Some(Color::Black) };
        let msg = RelayMessage::chess_move("AAAAAA-ZZZZZZ", "e2", "e4", None, clock);
        let event = sync.handle_inbound(msg, &mut game, t0).unwrap();
        assert!(matches!(event, SyncEvent::RemoteMove { .. }));
        assert!(sync.link().is_empty());
        assert_eq!(game.clock_snapshot(), clock);
        assert_eq!(game.turn(), Color::Black);
    }

    #[test]
    fn remote_promotion_is_forced_without_prompt() {
        let t0 = Instant::now();
        let pos = Position::from_fen("7k/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mut game = Match::from_position(pos, 600_000, t0);
        let mut sync = connected("ZZZZZZ", "AAAAAA", &mut game, t0);
        let msg = RelayMessage::chess_move("AAAAAA-ZZZZZZ", "a7", "a8", Some("n"), game.clock_snapshot());
        let event = sync.handle_inbound(msg, &mut game, t0).unwrap();
        let SyncEvent::RemoteMove { promoted_to, .. } = event else {
            panic!("expected a remote move");
        };
        assert_eq!(promoted_to, Some(PieceType::Knight));
        assert_eq!(game.board().get(sq("a8")), Some(Piece::new(PieceType::Knight, Color::White)));
        assert_eq!(game.phase(), crate::models::game_state::Phase::Active);
    }

    #[test]
    fn illegal_or_foreign_moves_are_dropped() {
        let t0 = Instant::now();
        let mut game = Match::new(600_000, t0);
        let mut sync = connected("ZZZZZZ", "AAAAAA", &mut game, t0);
        let before = game.clock_snapshot();
        let bogus = ClockSnapshot { white_ms: 1, black_ms: 1, running: None };

        let illegal = RelayMessage::chess_move("AAAAAA-ZZZZZZ", "e2", "e5", None, bogus);
        assert_eq!(sync.handle_inbound(illegal, &mut game, t0), None);
        assert_eq!(game.clock_snapshot(), before);

        let foreign = RelayMessage::chess_move("OTHER-ROOM", "e2", "e4", None, bogus);
        assert_eq!(sync.handle_inbound(foreign, &mut game, t0), None);

        let mut garbled = RelayMessage::new("move");
        garbled.move_from = Some("z9".to_string());
        assert_eq!(sync.handle_inbound(garbled, &mut game, t0), None);
        assert_eq!(game.history_len(), 0);
    }

    #[test]
    fn selection_respects_local_color() {
        let t0 = Instant::now();
        let mut game = Match::new(600_000, t0);
        let sync = connected("ZZZZZZ", "AAAAAA", &mut game, t0);
        assert_eq!(sync.check_selectable(&game, sq("e2")), Err(SyncError::NotYourTurn));
        game.commit(sq("e2"), sq("e4"), t0).unwrap();
        assert_eq!(sync.check_selectable(&game, sq("e4")), Err(SyncError::NotYourPiece));
        assert_eq!(sync.check_selectable(&game, sq("e7")), Ok(()));
    }

    #[test]
    fn new_request_replaces_live_session() {
        let t0 = Instant::now();
        let mut game = Match::new(600_000, t0);
        let mut sync = connected("ZZZZZZ", "AAAAAA", &mut game, t0);
        let event = sync.handle_inbound(RelayMessage::request("BBBBBB", "ZZZZZZ"), &mut game, t0);
        assert!(matches!(event, Some(SyncEvent::Connected { ref peer, .. }) if peer == "BBBBBB"));
        let session = sync.session().unwrap();
        assert_eq!(session.peer_id, "BBBBBB");
        assert_eq!(session.room, "BBBBBB-ZZZZZZ");
    }

    #[test]
    fn peer_leaving_ends_the_session() {
        let t0 = Instant::now();
        let mut game = Match::new(600_000, t0);
        let mut sync = connected("ZZZZZZ", "AAAAAA", &mut game, t0);
        let event = sync.handle_inbound(RelayMessage::left("AAAAAA-ZZZZZZ", "AAAAAA"), &mut game, t0);
        assert_eq!(event, Some(SyncEvent::PeerLeft { peer: "AAAAAA".to_string() }));
        assert!(!sync.is_connected());
    }
}
