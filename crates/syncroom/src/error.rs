//! Unified error type for syncroom.

use syncroom_protocol::ProtocolError;
use syncroom_room::RoomError;
use syncroom_session::SessionError;
use syncroom_store::StoreError;
use syncroom_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so `?`
/// lifts layer errors into this one.
#[derive(Debug, thiserror::Error)]
pub enum SyncroomError {
    /// A transport-level error (bind, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The room store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session was already torn down.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room operation failed.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use syncroom_protocol::SessionId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::HandshakeFailed {
            peer: "10.0.0.1:5000".into(),
            reason: "origin not allowed".into(),
        };
        let syncroom_err: SyncroomError = err.into();
        assert!(matches!(syncroom_err, SyncroomError::Transport(_)));
        assert!(syncroom_err.to_string().contains("origin not allowed"));
    }

    #[test]
    fn test_from_protocol_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProtocolError::Decode(json_err);
        let syncroom_err: SyncroomError = err.into();
        assert!(matches!(syncroom_err, SyncroomError::Protocol(_)));
    }

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Unavailable("down".into());
        let syncroom_err: SyncroomError = err.into();
        assert!(matches!(syncroom_err, SyncroomError::Store(_)));
        assert!(syncroom_err.to_string().contains("down"));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotFound(SessionId::from("abc"));
        let syncroom_err: SyncroomError = err.into();
        assert!(matches!(syncroom_err, SyncroomError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::InvalidPayload("seek requires isPlaying".into());
        let syncroom_err: SyncroomError = err.into();
        assert!(matches!(syncroom_err, SyncroomError::Room(_)));
    }
}
