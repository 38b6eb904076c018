//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning an event into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into an event).
    ///
    /// Common causes: malformed JSON, an unknown `event` name, a missing
    /// `roomCode` or `payload`, or a `video-control` action other than
    /// play/pause/seek.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
