/// Boxed error from the underlying socket library.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("bind to {addr} failed: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting a TCP connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade was refused or did not complete in time.
    ///
    /// Only this peer is affected; the listener keeps accepting.
    #[error("handshake with {peer} failed: {reason}")]
    HandshakeFailed { peer: String, reason: String },

    /// Writing a frame failed. The peer is gone or the socket is closed.
    #[error("send failed: {0}")]
    SendFailed(#[source] BoxError),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] BoxError),
}
