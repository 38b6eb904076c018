//! Transport abstraction layer for syncroom.
//!
//! Provides the [`Transport`] and [`Connection`] traits so the relay never
//! touches socket types directly. The only implementation today is the
//! WebSocket transport, which browsers reach with a plain `new WebSocket()`.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketHandshake, WebSocketTransport};

use std::fmt;

/// Opaque identifier for a transport-level connection.
///
/// This is only used for logging at the transport layer. Room membership is
/// keyed by the session identifier the registry hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// `accept` only takes the raw stream off the listener. The protocol
/// upgrade happens in [`Handshake::upgrade`], which the caller runs on its
/// own task so one slow peer never holds up the next accept.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted stream that has not been upgraded yet.
    type Handshake: Handshake<Connection = Self::Connection>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming stream.
    async fn accept(&mut self) -> Result<Self::Handshake, Self::Error>;
}

/// A pending upgrade of an accepted stream.
pub trait Handshake: Send + 'static {
    /// The connection produced once the upgrade completes.
    type Connection: Connection;
    /// The error type for a failed upgrade.
    type Error: std::error::Error + Send + Sync;

    /// Completes the upgrade.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive frames.
///
/// Implementations must allow `send` and `recv` to run concurrently from
/// different tasks: the relay pushes broadcasts to a connection while that
/// connection's own handler is parked in `recv`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// Returns `true` if a handshake carrying `origin` may be upgraded.
///
/// An empty allow-list disables the check. Requests without an `Origin`
/// header come from non-browser clients and are always let through, since
/// the header only exists to stop cross-site pages.
pub fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    match origin {
        _ if allowed.is_empty() => true,
        None => true,
        Some(origin) => allowed.iter().any(|a| a == origin),
    }
}
