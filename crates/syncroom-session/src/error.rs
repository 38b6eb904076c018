//! Error types for the session layer.

use syncroom_protocol::SessionId;

/// Errors that can occur in the connection registry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists with this identifier. This happens when a handler
    /// acts on a session after its teardown already ran.
    #[error("session {0} not found")]
    NotFound(SessionId),
}
