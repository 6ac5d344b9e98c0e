use actix::Message;
use serde::{Deserialize, Serialize};

use crate::models::clock::ClockSnapshot;

/// Reason attached to `request_rejected` when the target is not registered.
pub const REASON_OFFLINE: &str = "offline";

/// One relay message. The same flat shape travels in both directions; which
/// fields are set depends on `message_type`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayMessage {
    pub message_type: String,
    pub id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub room: Option<String>,
    pub move_from: Option<String>,
    pub move_to: Option<String>,
    pub promotion: Option<String>,
    pub clock: Option<ClockSnapshot>,
    pub ok: Option<bool>,
    pub reason: Option<String>,
}

impl RelayMessage {
    pub fn new(message_type: &str) -> Self {
        RelayMessage {
            message_type: message_type.to_string(),
            ..Default::default()
        }
    }

    pub fn register(id: &str) -> Self {
        RelayMessage { id: Some(id.to_string()), ..Self::new("register") }
    }

    pub fn registered(id: &str) -> Self {
        RelayMessage { id: Some(id.to_string()), ok: Some(true), ..Self::new("registered") }
    }

    pub fn request(from: &str, to: &str) -> Self {
        RelayMessage {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            ..Self::new("request")
        }
    }

    pub fn request_sent(to: &str) -> Self {
        RelayMessage { to: Some(to.to_string()), ..Self::new("request_sent") }
    }

    pub fn request_rejected(to: &str, reason: &str) -> Self {
        RelayMessage {
            to: Some(to.to_string()),
            reason: Some(reason.to_string()),
            ..Self::new("request_rejected")
        }
    }

    pub fn accept(from: &str, to: &str, room: &str) -> Self {
        RelayMessage {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            room: Some(room.to_string()),
            ..Self::new("accept")
        }
    }

    pub fn accepted(from: &str, to: &str, room: &str) -> Self {
        RelayMessage { message_type: "accepted".to_string(), ..Self::accept(from, to, room) }
    }

    pub fn join(room: &str, id: &str) -> Self {
        RelayMessage { room: Some(room.to_string()), id: Some(id.to_string()), ..Self::new("join") }
    }

    pub fn joined(room: &str, id: &str) -> Self {
        RelayMessage { message_type: "joined".to_string(), ..Self::join(room, id) }
    }

    pub fn leave(room: &str, id: &str) -> Self {
        RelayMessage { room: Some(room.to_string()), id: Some(id.to_string()), ..Self::new("leave") }
    }

    pub fn left(room: &str, id: &str) -> Self {
        RelayMessage { message_type: "left".to_string(), ..Self::leave(room, id) }
    }

    /// A committed move, with the sender's clocks at commit time.
    pub fn chess_move(
        room: &str,
        from: &str,
        to: &str,
        promotion: Option<&str>,
        clock: ClockSnapshot,
    ) -> Self {
        RelayMessage {
            room: Some(room.to_string()),
            move_from: Some(from.to_string()),
            move_to: Some(to.to_string()),
            promotion: promotion.map(str::to_string),
            clock: Some(clock),
            ..Self::new("move")
        }
    }

    pub fn sync(room: &str, id: &str, clock: ClockSnapshot) -> Self {
        RelayMessage {
            room: Some(room.to_string()),
            id: Some(id.to_string()),
            clock: Some(clock),
            ..Self::new("sync")
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Message type for WebSocket communication
#[derive(Message)]
#[rtype(result = "()")]
pub struct RelayText(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::Color;

    #[test]
    fn missing_fields_parse_as_none() {
        let msg = RelayMessage::from_json(r#"{"message_type":"register","id":"abc123"}"#).unwrap();
        assert_eq!(msg, RelayMessage::register("abc123"));
        assert!(msg.clock.is_none());
    }

    #[test]
    fn move_carries_clock_snapshot() {
        let clock = ClockSnapshot { white_ms: 9_000, black_ms: 5_000, running: Some(Color::Black) };
        let msg = RelayMessage::chess_move("AAAAAA-ZZZZZZ", "a7", "a8", Some("q"), clock);
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""running":"black""#));
        assert_eq!(RelayMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(RelayMessage::from_json("not json").is_err());
        assert!(RelayMessage::from_json(r#"{"id":"x"}"#).is_err());
    }
}
