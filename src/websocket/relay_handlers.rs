use log::{debug, info, warn};

use crate::models::app_state::{Delivery, RelayRouter};
use crate::models::messages::{RelayMessage, REASON_OFFLINE};

impl RelayRouter {
    /// Routes one inbound message from `conn_id`. Messages missing the
    /// fields their type needs are dropped.
    pub fn route(&mut self, conn_id: &str, msg: RelayMessage) -> Vec<Delivery> {
        match msg.message_type.as_str() {
            "register" => self.handle_register(conn_id, msg),
            "request" => self.handle_request(conn_id, msg),
            "accept" => self.handle_accept(msg),
            "join" => self.handle_join(conn_id, msg),
            "leave" => self.handle_leave(conn_id, msg),
            "move" | "sync" => self.handle_forward(conn_id, msg),
            _ => {
                warn!("Unknown message type: {}", msg.message_type);
                Vec::new()
            }
        }
    }

    fn handle_register(&mut self, conn_id: &str, msg: RelayMessage) -> Vec<Delivery> {
        let Some(id) = msg.id.filter(|id| !id.trim().is_empty()) else {
            warn!("register without id from {}", conn_id);
            return Vec::new();
        };
        let id = id.trim().to_uppercase();
        if let Some(previous) = self.conn_to_id.insert(conn_id.to_string(), id.clone()) {
            if previous != id && self.id_to_conn.get(&previous).map(String::as_str) == Some(conn_id) {
                self.id_to_conn.remove(&previous);
            }
        }
        self.id_to_conn.insert(id.clone(), conn_id.to_string());
        info!("Registered {} on connection {}", id, conn_id);
        vec![Delivery::new(conn_id, RelayMessage::registered(&id))]
    }

    fn handle_request(&mut self, conn_id: &str, msg: RelayMessage) -> Vec<Delivery> {
        let (Some(from), Some(to)) = (msg.from, msg.to) else {
            warn!("request without from/to from {}", conn_id);
            return Vec::new();
        };
        let target = to.to_uppercase();
        match self.id_to_conn.get(&target) {
            Some(target_conn) => {
                info!("Forwarding request {} -> {}", from, target);
                vec![
                    Delivery::new(target_conn, RelayMessage::request(&from, &target)),
                    Delivery::new(conn_id, RelayMessage::request_sent(&target)),
                ]
            }
            None => {
                info!("Request {} -> {} rejected: offline", from, target);
                vec![Delivery::new(conn_id, RelayMessage::request_rejected(&target, REASON_OFFLINE))]
            }
        }
    }

    fn handle_accept(&mut self, msg: RelayMessage) -> Vec<Delivery> {
        let (Some(from), Some(to), Some(room)) = (msg.from, msg.to, msg.room) else {
            warn!("accept without from/to/room");
            return Vec::new();
        };
        match self.id_to_conn.get(&to.to_uppercase()) {
            Some(requester) => {
                info!("{} accepted {} in room {}", from, to, room);
                vec![Delivery::new(requester, RelayMessage::accepted(&from, &to, &room))]
            }
            None => {
                debug!("accept for unknown requester {}", to);
                Vec::new()
            }
        }
    }

    fn handle_join(&mut self, conn_id: &str, msg: RelayMessage) -> Vec<Delivery> {
        let Some(room) = msg.room else {
            warn!("join without room from {}", conn_id);
            return Vec::new();
        };
        let members = self.rooms.entry(room.clone()).or_default();
        if !members.iter().any(|m| m == conn_id) {
            members.push(conn_id.to_string());
        }
        let id = msg.id.or_else(|| self.conn_to_id.get(conn_id).cloned()).unwrap_or_default();
        info!("{} joined room {}", id, room);
        self.broadcast(&room, None, &RelayMessage::joined(&room, &id))
    }

    fn handle_leave(&mut self, conn_id: &str, msg: RelayMessage) -> Vec<Delivery> {
        let Some(room) = msg.room else {
            warn!("leave without room from {}", conn_id);
            return Vec::new();
        };
        if let Some(members) = self.rooms.get_mut(&room) {
            members.retain(|m| m != conn_id);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
        let id = msg.id.or_else(|| self.conn_to_id.get(conn_id).cloned()).unwrap_or_default();
        info!("{} left room {}", id, room);
        self.broadcast(&room, None, &RelayMessage::left(&room, &id))
    }

    fn handle_forward(&mut self, conn_id: &str, msg: RelayMessage) -> Vec<Delivery> {
        let Some(room) = msg.room.clone() else {
            warn!("{} without room from {}", msg.message_type, conn_id);
            return Vec::new();
        };
        debug!("Forwarding {} in room {}", msg.message_type, room);
        self.broadcast(&room, Some(conn_id), &msg)
    }

    /// Every member of `room`, minus `except`.
    fn broadcast(&self, room: &str, except: Option<&str>, msg: &RelayMessage) -> Vec<Delivery> {
        self.room_members(room)
            .iter()
            .filter(|m| Some(m.as_str()) != except)
            .map(|m| Delivery::new(m, msg.clone()))
            .collect()
    }
}
