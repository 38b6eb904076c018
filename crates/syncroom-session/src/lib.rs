//! Connection sessions for syncroom.
//!
//! This crate knows who is connected and which rooms each connection has
//! joined:
//!
//! 1. **Sessions**: one per socket, with an outbound event channel ([`Session`])
//! 2. **Membership**: room code to connected sessions ([`ConnectionRegistry`])
//!
//! Nothing here is persisted. The membership view is rebuilt from joins
//! after a restart.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← asks the registry who should receive an event
//!     ↕
//! Session Layer (this crate)  ← connection identity and room membership
//!     ↕
//! Protocol Layer (below)  ← provides SessionId, RoomCode, ServerEvent
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::{ConnectionRegistry, Departure, Joined};
pub use session::{Outbound, Session};
