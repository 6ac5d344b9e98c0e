pub mod handler;
pub mod relay_handlers;

pub use handler::{ws_index, RelaySocket};
