use std::time::{Duration, Instant};

use peer_chess::game::board::{Color, Piece, PieceType, Position, Square};
use peer_chess::models::game_state::{Match, Outcome, Phase};
use peer_chess::GameError;

fn sq(name: &str) -> Square {
    Square::from_algebraic(name).unwrap()
}

fn game_from(fen: &str, clock_ms: u64, now: Instant) -> Match {
    Match::from_position(Position::from_fen(fen).unwrap(), clock_ms, now)
}

fn play(game: &mut Match, moves: &[(&str, &str)], now: Instant) {
    for (from, to) in moves {
        game.commit(sq(from), sq(to), now)
            .unwrap_or_else(|e| panic!("{from}{to}: {e}"));
    }
}

#[test]
fn commits_then_undos_restore_board_and_clocks() {
    let t0 = Instant::now();
    let mut game = Match::new(600_000, t0);
    let before_fen = game.fen();
    let before_clock = game.clock_snapshot();

    let line = [
        ("e2", "e4"), ("c7", "c5"), ("g1", "f3"), ("d7", "d6"),
        ("d2", "d4"), ("c5", "d4"), ("f3", "d4"), ("g8", "f6"),
        ("f1", "e2"), ("e7", "e5"), ("e1", "g1"),
    ];
    let mut now = t0;
    for (i, (from, to)) in line.iter().enumerate() {
        if i > 0 {
            now += Duration::from_millis(1_750);
            assert_eq!(game.tick(now), None);
        }
        game.commit(sq(from), sq(to), now).unwrap();
    }
    assert_eq!(game.history_len(), line.len());
    assert!(game.clock().remaining(Color::White) < 600_000);

    for _ in 0..line.len() {
        now += Duration::from_millis(300);
        game.undo(now).unwrap();
    }
    assert_eq!(game.fen(), before_fen);
    assert_eq!(game.clock_snapshot(), before_clock);
    assert!(game.captured().of(Color::White).is_empty());
    assert!(game.captured().of(Color::Black).is_empty());
}

#[test]
fn scholars_mate_ends_the_game() {
    let t0 = Instant::now();
    let mut game = Match::new(600_000, t0);
    play(
        &mut game,
        &[("e2", "e4"), ("e7", "e5"), ("f1", "c4"), ("b8", "c6"), ("d1", "h5"), ("g8", "f6")],
        t0,
    );
    let done = game.commit(sq("h5"), sq("f7"), t0).unwrap();
    assert!(done.check);
    assert_eq!(done.outcome, Some(Outcome::Checkmate { winner: Color::White }));
    assert_eq!(game.phase(), Phase::Terminal(Outcome::Checkmate { winner: Color::White }));
    assert_eq!(game.clock().running(), None);
    assert_eq!(game.tick(t0 + Duration::from_secs(3_600)), None);
    assert_eq!(game.commit(sq("e8"), sq("f7"), t0), Err(GameError::GameOver));
}

#[test]
fn stalemate_is_a_draw() {
    let t0 = Instant::now();
    // Qb6 covers a7, b7 and b8 without checking the king on a8.
    let mut game = game_from("k7/8/8/2Q5/8/8/8/4K3 w - - 0 1", 600_000, t0);
    let done = game.commit(sq("c5"), sq("b6"), t0).unwrap();
    assert_eq!(done.outcome, Some(Outcome::Stalemate));
    assert_eq!(done.outcome.unwrap().winner(), None);
}

#[test]
fn timeout_with_queen_against_rook_goes_to_the_queen() {
    // White holds a queen (9), black a rook (5). White's clock runs out, yet
    // material decides and white keeps the win.
    let t0 = Instant::now();
    let mut game = game_from("r3k3/8/8/8/8/8/8/3QK3 w - - 0 1", 2_000, t0);
    assert_eq!(game.tick(t0 + Duration::from_millis(1_000)), None);
    let outcome = game.tick(t0 + Duration::from_millis(2_400)).unwrap();
    assert_eq!(outcome, Outcome::Timeout { expired: Color::White, winner: Some(Color::White) });
    assert!(outcome.reason(game.board()).contains("9 vs black 5"));
    assert_eq!(game.clock().remaining(Color::White), 0);
}

#[test]
fn timeout_with_level_material_is_a_draw_for_either_side() {
    let t0 = Instant::now();
    for fen in ["r3k3/8/8/8/8/8/8/R3K3 w - - 0 1", "r3k3/8/8/8/8/8/8/R3K3 b - - 0 1"] {
        let mut game = game_from(fen, 500, t0);
        let outcome = game.tick(t0 + Duration::from_millis(800)).unwrap();
        assert_eq!(outcome.winner(), None, "{fen}");
        assert!(game.is_terminal());
    }
}

#[test]
fn clock_runs_for_opponent_while_promotion_is_pending() {
    let t0 = Instant::now();
    let mut game = game_from("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1", 60_000, t0);
    let done = game.commit(sq("b7"), sq("b8"), t0).unwrap();
    assert!(done.promotion_pending);
    assert_eq!(game.turn(), Color::Black);

    let later = t0 + Duration::from_secs(5);
    game.tick(later);
    assert_eq!(game.clock().remaining(Color::Black), 55_000);
    assert_eq!(game.clock().remaining(Color::White), 60_000);

    let resolved = game.resolve_promotion(PieceType::Queen).unwrap();
    assert!(resolved.check);
    assert_eq!(game.board().get(sq("b8")), Some(Piece::new(PieceType::Queen, Color::White)));
    assert_eq!(game.resolve_promotion(PieceType::Queen), Err(GameError::NoPromotionPending));
}

#[test]
fn timeout_can_end_a_pending_promotion() {
    let t0 = Instant::now();
    let mut game = game_from("4k3/1P6/8/8/8/8/8/4K3 w - - 0 1", 1_000, t0);
    game.commit(sq("b7"), sq("b8"), t0).unwrap();
    let outcome = game.tick(t0 + Duration::from_secs(2)).unwrap();
    assert_eq!(outcome, Outcome::Timeout { expired: Color::Black, winner: Some(Color::White) });
    assert_eq!(game.resolve_promotion(PieceType::Queen), Err(GameError::NoPromotionPending));
}

#[test]
fn fen_survives_a_game() {
    let t0 = Instant::now();
    let mut game = Match::new(600_000, t0);
    play(&mut game, &[("e2", "e4"), ("c7", "c5"), ("g1", "f3")], t0);
    assert_eq!(
        game.fen(),
        "rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
    );
}
