//! # syncroom
//!
//! Real-time relay that keeps shared video-watching rooms in sync.
//!
//! Clients connect over WebSocket, join rooms by code, and exchange
//! playback control, chat, and WebRTC signaling. Playback changes are
//! written through to a durable [`RoomStore`](syncroom_store::RoomStore)
//! so late joiners converge on the room's current position.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use syncroom::prelude::*;
//!
//! # async fn start() -> Result<(), SyncroomError> {
//! let store = Arc::new(MemoryRoomStore::with_rooms([RoomRecord::active("AB12", "host")]));
//! let server = SyncServerBuilder::new()
//!     .bind("127.0.0.1:3001")
//!     .build(store)
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
pub mod error;
pub(crate) mod handler;
pub mod server;

pub use config::ServerConfig;
pub use error::SyncroomError;
pub use server::{ServerMonitor, SyncServer, SyncServerBuilder};

/// Everything needed to run a server, in one import.
pub mod prelude {
    pub use crate::{ServerConfig, ServerMonitor, SyncServer, SyncServerBuilder, SyncroomError};
    pub use syncroom_protocol::{
        ClientEvent, Codec, JsonCodec, PlaybackAction, PlaybackState, RoomCode, ServerEvent,
        SessionId, UserId,
    };
    pub use syncroom_store::{MemoryRoomStore, RoomRecord, RoomStore};
    pub use syncroom_store::{MongoConfig, MongoRoomStore};
}
