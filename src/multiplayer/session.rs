use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

use crate::game::board::Color;

/// Alphabet for generated peer ids; no 0/O or 1/I look-alikes.
const ID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const LOCAL_ID_LEN: usize = 6;

/// An established link with one remote peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiplayerSession {
    pub local_id: String,
    pub peer_id: String,
    pub room: String,
    pub color: Color,
}

impl MultiplayerSession {
    pub fn new(local_id: &str, peer_id: &str) -> Self {
        MultiplayerSession {
            local_id: local_id.to_string(),
            peer_id: peer_id.to_string(),
            room: room_name(local_id, peer_id),
            color: assign_color(local_id, peer_id),
        }
    }

    /// Keeps a room name chosen by the peer instead of the derived one.
    pub fn with_room(mut self, room: &str) -> Self {
        self.room = room.to_string();
        self
    }
}

/// Where the local side is in the connect handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Offline,
    Requesting { peer: String },
    Connected,
}

/// The lexicographically smaller id plays white. Both peers compute the
/// same answer without talking to each other.
pub fn assign_color(local_id: &str, peer_id: &str) -> Color {
    if local_id < peer_id {
        Color::White
    } else {
        Color::Black
    }
}

/// Both ids sorted and joined by `-`.
pub fn room_name(a: &str, b: &str) -> String {
    let mut ids = [a, b];
    ids.sort();
    ids.join("-")
}

pub fn generate_local_id() -> String {
    generate_local_id_with(&mut thread_rng())
}

pub fn generate_local_id_with<R: Rng>(rng: &mut R) -> String {
    (0..LOCAL_ID_LEN)
        .filter_map(|_| ID_ALPHABET.choose(rng).map(|&b| b as char))
        .collect()
}
