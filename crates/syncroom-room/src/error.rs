//! Error types for the room layer.

use syncroom_session::SessionError;
use syncroom_store::StoreError;

/// Errors that can occur while coordinating a room.
///
/// None of these are sent to clients. The connection handler logs them
/// and keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room store failed a lookup or a patch.
    #[error("room store: {0}")]
    Store(#[from] StoreError),

    /// A `video-control` payload is missing a field its action requires.
    #[error("invalid playback payload: {0}")]
    InvalidPayload(String),

    /// The session acting on the room is no longer registered.
    #[error(transparent)]
    Session(#[from] SessionError),
}
