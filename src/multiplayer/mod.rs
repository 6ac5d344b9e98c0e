pub mod peer;
pub mod session;
pub mod sync;

pub use peer::{Cadence, Notification, PeerEvent, PeerGame};
pub use session::{assign_color, room_name, ConnectionState, MultiplayerSession};
pub use sync::{MultiplayerSync, RelayLink, SyncEvent};
