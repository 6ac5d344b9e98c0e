use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::game::board::Color;

/// Wire and history form of the clocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSnapshot {
    pub white_ms: u64,
    pub black_ms: u64,
    pub running: Option<Color>,
}

impl ClockSnapshot {
    pub fn remaining(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }
}

/// Two countdown timers with at most one running.
#[derive(Clone, Debug)]
pub struct ChessClock {
    remaining_ms: [u64; 2],
    running: Option<Color>,
    last_tick: Option<Instant>,
}

impl ChessClock {
    pub fn new(initial_ms: u64) -> Self {
        ChessClock {
            remaining_ms: [initial_ms; 2],
            running: None,
            last_tick: None,
        }
    }

    pub fn remaining(&self, color: Color) -> u64 {
        self.remaining_ms[color.index()]
    }

    pub fn running(&self) -> Option<Color> {
        self.running
    }

    /// Runs `side`'s clock from `now`. Starting the side that is already
    /// running only resets the tick reference.
    pub fn start(&mut self, side: Color, now: Instant) {
        self.running = Some(side);
        self.last_tick = Some(now);
    }

    pub fn stop(&mut self) {
        self.running = None;
        self.last_tick = None;
    }

    /// Charges the time since the previous tick to the running side. Returns
    /// the side whose clock just reached zero; the clock stops at that point
    /// so expiry is reported once.
    pub fn tick(&mut self, now: Instant) -> Option<Color> {
        let Some(side) = self.running else {
            return None;
        };
        let last = self.last_tick.unwrap_or(now);
        let elapsed = now.saturating_duration_since(last).as_millis() as u64;
        self.last_tick = Some(now);

        let remaining = &mut self.remaining_ms[side.index()];
        *remaining = remaining.saturating_sub(elapsed);
        if *remaining == 0 {
            self.stop();
            return Some(side);
        }
        None
    }

    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            white_ms: self.remaining(Color::White),
            black_ms: self.remaining(Color::Black),
            running: self.running,
        }
    }

    /// Overwrites both counters and the running side. The tick reference is
    /// reset to `now` so time already charged is not charged again.
    pub fn restore(&mut self, snapshot: &ClockSnapshot, now: Instant) {
        self.remaining_ms = [snapshot.white_ms, snapshot.black_ms];
        match snapshot.running {
            Some(side) => self.start(side, now),
            None => self.stop(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn only_the_running_side_is_charged() {
        let t0 = Instant::now();
        let mut clock = ChessClock::new(10_000);
        clock.start(Color::White, t0);
        assert_eq!(clock.tick(t0 + Duration::from_millis(1_500)), None);
        assert_eq!(clock.remaining(Color::White), 8_500);
        assert_eq!(clock.remaining(Color::Black), 10_000);

        clock.start(Color::Black, t0 + Duration::from_millis(1_600));
        clock.tick(t0 + Duration::from_millis(2_600));
        assert_eq!(clock.remaining(Color::White), 8_500);
        assert_eq!(clock.remaining(Color::Black), 9_000);
    }

    #[test]
    fn restarting_resets_the_tick_reference() {
        let t0 = Instant::now();
        let mut clock = ChessClock::new(10_000);
        clock.start(Color::White, t0);
        clock.start(Color::White, t0 + Duration::from_millis(4_000));
        clock.tick(t0 + Duration::from_millis(4_500));
        assert_eq!(clock.remaining(Color::White), 9_500);
    }

    #[test]
    fn expiry_clamps_at_zero_and_fires_once() {
        let t0 = Instant::now();
        let mut clock = ChessClock::new(1_000);
        clock.start(Color::Black, t0);
        assert_eq!(clock.tick(t0 + Duration::from_millis(5_000)), Some(Color::Black));
        assert_eq!(clock.remaining(Color::Black), 0);
        assert_eq!(clock.running(), None);
        assert_eq!(clock.tick(t0 + Duration::from_millis(6_000)), None);
    }

    #[test]
    fn stopped_clock_does_not_move() {
        let t0 = Instant::now();
        let mut clock = ChessClock::new(1_000);
        clock.start(Color::White, t0);
        clock.stop();
        assert_eq!(clock.tick(t0 + Duration::from_millis(900)), None);
        assert_eq!(clock.remaining(Color::White), 1_000);
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let t0 = Instant::now();
        let mut clock = ChessClock::new(5_000);
        clock.start(Color::White, t0);
        clock.tick(t0 + Duration::from_millis(250));
        let snap = clock.snapshot();
        clock.start(Color::Black, t0 + Duration::from_millis(300));
        clock.tick(t0 + Duration::from_millis(1_300));
        clock.restore(&snap, t0 + Duration::from_millis(2_000));
        assert_eq!(clock.snapshot(), snap);
        assert_eq!(snap.running, Some(Color::White));
        assert_eq!(snap.remaining(Color::White), 4_750);
    }
}
