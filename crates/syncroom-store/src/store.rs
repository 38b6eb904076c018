//! The `RoomStore` trait: the narrow seam between the relay and the
//! durable room collection.

use std::future::Future;

use syncroom_protocol::RoomCode;

use crate::{PatchAck, RoomFilter, RoomPatch, RoomRecord, StoreError};

/// Async lookup and patch operations over room records, keyed by code.
///
/// # Trait bounds
///
/// - `Send + Sync` → one store is shared by every connection task.
/// - `'static` → it lives as long as the server.
///
/// Implementations may suspend on I/O in both methods; those are the only
/// places a message handler yields.
pub trait RoomStore: Send + Sync + 'static {
    /// Returns the active record for `room_code`, if any.
    ///
    /// If several active records share a code (the store does not enforce
    /// uniqueness) the first one found wins.
    fn find_active_room(
        &self,
        room_code: &RoomCode,
    ) -> impl Future<Output = Result<Option<RoomRecord>, StoreError>> + Send;

    /// Applies `patch` to the first record selected by `filter`.
    ///
    /// A filter that matches nothing is not an error: the ack reports
    /// `matched == 0`.
    fn patch_room(
        &self,
        filter: RoomFilter,
        patch: RoomPatch,
    ) -> impl Future<Output = Result<PatchAck, StoreError>> + Send;
}
