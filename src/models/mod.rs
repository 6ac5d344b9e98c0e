pub mod ai;
pub mod app_state;
pub mod clock;
pub mod game_state;
pub mod messages;

// Re-export important types
pub use ai::{AiAssist, GreedySelector, MoveSelector};
pub use app_state::{AppState, Delivery, RelayRouter};
pub use clock::{ChessClock, ClockSnapshot};
pub use game_state::*;
pub use messages::*;
