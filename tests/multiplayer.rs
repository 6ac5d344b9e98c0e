//! Two peers talking through the real relay routing tables.

use std::time::{Duration, Instant};

use peer_chess::config::MatchConfig;
use peer_chess::game::board::{Color, Piece, PieceType, Position, Square};
use peer_chess::models::app_state::RelayRouter;
use peer_chess::models::messages::RelayMessage;
use peer_chess::multiplayer::{ConnectionState, Notification, PeerEvent, PeerGame, SyncEvent};

type Peer = PeerGame<Vec<RelayMessage>>;

fn sq(name: &str) -> Square {
    Square::from_algebraic(name).unwrap()
}

struct Harness {
    router: RelayRouter,
    peers: Vec<(String, Peer)>,
    received: Vec<Vec<Notification>>,
}

impl Harness {
    fn new(ids: &[&str], now: Instant) -> Self {
        let mut harness = Harness {
            router: RelayRouter::new(),
            peers: ids
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let peer = PeerGame::with_id(MatchConfig::default(), id, Vec::new(), now);
                    (format!("conn-{i}"), peer)
                })
                .collect(),
            received: vec![Vec::new(); ids.len()],
        };
        for i in 0..ids.len() {
            harness.send(i, PeerEvent::Register, now);
        }
        harness
    }

    fn peer(&self, i: usize) -> &Peer {
        &self.peers[i].1
    }

    fn send(&mut self, i: usize, event: PeerEvent, now: Instant) -> Vec<Notification> {
        let out = self.peers[i].1.handle(event, now);
        self.pump(now);
        out
    }

    /// Moves queued messages through the router until everything settles.
    fn pump(&mut self, now: Instant) {
        loop {
            let mut outgoing = Vec::new();
            for (conn, peer) in &mut self.peers {
                for msg in peer.sync_mut().link_mut().drain(..) {
                    outgoing.push((conn.clone(), msg));
                }
            }
            if outgoing.is_empty() {
                return;
            }
            for (conn, msg) in outgoing {
                for delivery in self.router.route(&conn, msg) {
                    let Some(i) = self.peers.iter().position(|(c, _)| *c == delivery.conn_id) else {
                        continue;
                    };
                    let text = delivery.message.to_json().unwrap();
                    let notes = self.peers[i].1.handle(PeerEvent::Inbound(text), now);
                    self.received[i].extend(notes);
                }
            }
        }
    }

    fn connect(&mut self, from: usize, to_id: &str, now: Instant) {
        self.send(from, PeerEvent::Connect(to_id.to_string()), now);
    }
}

#[test]
fn both_peers_agree_on_colors_and_room() {
    let t0 = Instant::now();
    let mut h = Harness::new(&["BBBBBB", "AAAAAA"], t0);
    h.connect(0, "aaaaaa", t0);

    for i in 0..2 {
        let session = h.peer(i).sync().session().expect("connected");
        assert_eq!(session.room, "AAAAAA-BBBBBB");
        assert_eq!(h.peer(i).sync().state(), &ConnectionState::Connected);
    }
    assert_eq!(h.peer(0).sync().local_color(), Some(Color::Black));
    assert_eq!(h.peer(1).sync().local_color(), Some(Color::White));
    assert!(h.received[1].iter().any(|n| matches!(
        n,
        Notification::Sync(SyncEvent::Connected { color: Color::White, .. })
    )));
}

#[test]
fn offline_peer_is_reported() {
    let t0 = Instant::now();
    let mut h = Harness::new(&["AAAAAA"], t0);
    h.connect(0, "QQQQQQ", t0);
    assert!(h.received[0].iter().any(|n| matches!(
        n,
        Notification::Sync(SyncEvent::RequestRejected { reason, .. }) if reason == "offline"
    )));
    assert!(h.peer(0).sync().session().is_none());
}

#[test]
fn moves_and_clocks_converge() {
    let t0 = Instant::now();
    let mut h = Harness::new(&["AAAAAA", "BBBBBB"], t0);
    h.connect(0, "BBBBBB", t0);

    let t1 = t0 + Duration::from_secs(3);
    h.send(0, PeerEvent::Tick, t1);
    h.send(0, PeerEvent::Move { from: sq("e2"), to: sq("e4") }, t1);
    assert_eq!(h.peer(1).game().fen(), h.peer(0).game().fen());
    assert_eq!(h.peer(1).game().clock_snapshot(), h.peer(0).game().clock_snapshot());
    assert_eq!(h.peer(1).game().clock().remaining(Color::White), 597_000);

    // White may not move black's pieces, black may not move out of turn.
    let out = h.send(0, PeerEvent::Select(sq("e7")), t1);
    assert!(matches!(out[0], Notification::Rejected(_)));
    let out = h.send(1, PeerEvent::Select(sq("d2")), t1);
    assert!(matches!(out[0], Notification::Rejected(_)));

    h.send(1, PeerEvent::Move { from: sq("e7"), to: sq("e5") }, t1);
    h.send(0, PeerEvent::Move { from: sq("g1"), to: sq("f3") }, t1);
    assert_eq!(h.peer(0).game().fen(), h.peer(1).game().fen());
    assert_eq!(h.peer(1).game().history_len(), 3);
}

#[test]
fn remote_queen_promotion_needs_no_prompt() {
    let t0 = Instant::now();
    let mut h = Harness::new(&["AAAAAA", "BBBBBB"], t0);
    h.connect(0, "BBBBBB", t0);

    // Walk white's h-pawn to h7 and capture onto g8.
    for (side, from, to) in [
        (0, "h2", "h4"), (1, "g7", "g5"), (0, "h4", "g5"), (1, "h7", "h6"),
        (0, "g5", "h6"), (1, "g8", "f6"), (0, "h6", "h7"), (1, "f6", "g8"),
    ] {
        let out = h.send(side, PeerEvent::Move { from: sq(from), to: sq(to) }, t0);
        assert!(matches!(out[0], Notification::Committed(_)), "{from}{to}: {out:?}");
    }

    let out = h.send(0, PeerEvent::Move { from: sq("h7"), to: sq("g8") }, t0);
    assert!(out.iter().any(|n| matches!(n, Notification::PromotionPrompt { .. })));
    // Nothing is relayed until the choice is made.
    assert_eq!(h.peer(1).game().history_len(), 8);

    h.send(0, PeerEvent::Promote(PieceType::Queen), t0);
    let queen = Some(Piece::new(PieceType::Queen, Color::White));
    assert_eq!(h.peer(0).game().board().get(sq("g8")), queen);
    assert_eq!(h.peer(1).game().board().get(sq("g8")), queen);
    assert!(!h.received[1].iter().any(|n| matches!(n, Notification::PromotionPrompt { .. })));
    assert_eq!(h.peer(0).game().fen(), h.peer(1).game().fen());
}

#[test]
fn promotion_message_applies_directly() {
    let t0 = Instant::now();
    let pos = Position::from_fen("7k/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
    let mut receiver = PeerGame::with_position(MatchConfig::default(), "BBBBBB", Vec::new(), pos, t0);
    let accepted = RelayMessage::accepted("AAAAAA", "BBBBBB", "AAAAAA-BBBBBB");
    receiver.handle(PeerEvent::Inbound(accepted.to_json().unwrap()), t0);
    assert_eq!(receiver.sync().local_color(), Some(Color::Black));

    let snapshot = receiver.game().clock_snapshot();
    let msg = RelayMessage::chess_move("AAAAAA-BBBBBB", "a7", "a8", Some("q"), snapshot);
    let out = receiver.handle(PeerEvent::Inbound(msg.to_json().unwrap()), t0);
    assert!(!out.iter().any(|n| matches!(n, Notification::PromotionPrompt { .. })));
    assert_eq!(
        receiver.game().board().get(sq("a8")),
        Some(Piece::new(PieceType::Queen, Color::White))
    );
    assert!(out.iter().any(|n| matches!(n, Notification::Check(Color::Black))));
}

#[test]
fn malformed_relay_traffic_does_not_disturb_later_moves() {
    let t0 = Instant::now();
    let mut h = Harness::new(&["AAAAAA", "BBBBBB"], t0);
    h.connect(0, "BBBBBB", t0);

    let junk = [
        "{not json",
        r#"{"message_type":"move","room":"AAAAAA-BBBBBB"}"#,
        r#"{"message_type":"move","room":"ELSEWHERE","move_from":"e2","move_to":"e4"}"#,
        r#"{"message_type":"move","room":"AAAAAA-BBBBBB","move_from":"e2","move_to":"e6"}"#,
    ];
    for text in junk {
        let out = h.send(1, PeerEvent::Inbound(text.to_string()), t0);
        assert!(out.is_empty(), "{text}");
    }
    assert_eq!(h.peer(1).game().history_len(), 0);

    h.send(0, PeerEvent::Move { from: sq("d2"), to: sq("d4") }, t0);
    assert_eq!(h.peer(1).game().history_len(), 1);
}

#[test]
fn leaving_tears_down_both_sessions() {
    let t0 = Instant::now();
    let mut h = Harness::new(&["AAAAAA", "BBBBBB"], t0);
    h.connect(0, "BBBBBB", t0);
    h.send(1, PeerEvent::Disconnect, t0);
    assert!(h.peer(1).sync().session().is_none());
    assert!(h.peer(0).sync().session().is_none());
    assert!(h.received[0].iter().any(|n| matches!(n, Notification::Sync(SyncEvent::PeerLeft { .. }))));

    // Offline again: moves stay local and nothing is relayed.
    h.send(0, PeerEvent::Move { from: sq("e2"), to: sq("e4") }, t0);
    assert_eq!(h.peer(1).game().history_len(), 0);
}
