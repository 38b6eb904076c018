//! Durable room state for syncroom.
//!
//! The relay treats the room collection as an external collaborator and
//! reaches it only through the [`RoomStore`] trait: look up the active
//! record for a code, or patch a record selected by a [`RoomFilter`].
//!
//! # Implementations
//!
//! - [`MemoryRoomStore`]: in-process, for tests and local runs
//! - [`MongoRoomStore`]: MongoDB, behind the `mongodb` feature (default)

mod error;
mod memory;
#[cfg(feature = "mongodb")]
mod mongo;
mod record;
mod store;

pub use error::StoreError;
pub use memory::MemoryRoomStore;
#[cfg(feature = "mongodb")]
pub use mongo::{MongoConfig, MongoRoomStore};
pub use record::{PatchAck, RoomFilter, RoomPatch, RoomRecord};
pub use store::RoomStore;
