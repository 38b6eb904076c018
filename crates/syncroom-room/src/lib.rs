//! Room coordination for syncroom.
//!
//! Everything a room does after a client has joined it happens here:
//! playback updates are checked and written through to the store, relayed
//! traffic is fanned out to members, and the host can end the room.
//!
//! # Key types
//!
//! - [`RoomCoordinator`]: playback rules, durable writes, per-room cache
//! - [`RelayDispatcher`]: membership changes and fan-out to connections
//! - [`LifecycleManager`]: the exactly-once `Active → Ended` transition
//! - [`RoomError`]: what the handler logs when something fails

mod coordinator;
mod error;
mod lifecycle;
mod relay;

pub use coordinator::{RoomCoordinator, playback_from_payload};
pub use error::RoomError;
pub use lifecycle::{EndOutcome, LifecycleManager};
pub use relay::RelayDispatcher;
