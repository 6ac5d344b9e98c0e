use actix::Addr;
use log::info;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::messages::RelayMessage;
use crate::websocket::RelaySocket;

/// A message the relay must write to one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub conn_id: String,
    pub message: RelayMessage,
}

impl Delivery {
    pub fn new(conn_id: &str, message: RelayMessage) -> Self {
        Delivery { conn_id: conn_id.to_string(), message }
    }
}

/// Relay routing tables: registered ids and room membership, keyed by
/// connection id. Message handlers live in `websocket::relay_handlers`.
#[derive(Debug, Default)]
pub struct RelayRouter {
    pub(crate) id_to_conn: HashMap<String, String>,
    pub(crate) conn_to_id: HashMap<String, String>,
    pub(crate) rooms: HashMap<String, Vec<String>>,
}

impl RelayRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_for(&self, id: &str) -> Option<&str> {
        self.id_to_conn.get(&id.to_uppercase()).map(String::as_str)
    }

    pub fn id_for(&self, conn_id: &str) -> Option<&str> {
        self.conn_to_id.get(conn_id).map(String::as_str)
    }

    pub fn room_members(&self, room: &str) -> &[String] {
        self.rooms.get(room).map_or(&[][..], Vec::as_slice)
    }

    /// Forgets a closed connection: its id mapping (unless another
    /// connection re-registered the id) and every room membership.
    pub fn disconnect(&mut self, conn_id: &str) {
        if let Some(id) = self.conn_to_id.remove(conn_id) {
            if self.id_to_conn.get(&id).map(String::as_str) == Some(conn_id) {
                self.id_to_conn.remove(&id);
            }
            info!("Unregistered {} (connection {})", id, conn_id);
        }
        self.rooms.retain(|_, members| {
            members.retain(|m| m != conn_id);
            !members.is_empty()
        });
    }
}

/// Application state shared between connections
pub struct AppState {
    pub router: Mutex<RelayRouter>,
    pub sessions: Mutex<HashMap<String, Addr<RelaySocket>>>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            router: Mutex::new(RelayRouter::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
