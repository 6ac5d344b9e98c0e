//! Two-player chess: a rules engine, match clock and game state machine, plus
//! peer-to-peer synchronisation through a small websocket relay.

pub mod config;
pub mod errors;
pub mod game;
pub mod models;
pub mod multiplayer;
pub mod routes;
pub mod websocket;

pub use config::{MatchConfig, RelayConfig};
pub use errors::{GameError, SyncError};
