//! Wire protocol for syncroom.
//!
//! This crate defines the "language" that viewers and the relay speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomCode`], etc.):
//!   the events that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those events are
//!   converted to/from frame bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (events) → Session / Room layers
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientEvent, PlaybackAction, PlaybackState, Recipient, RoomCode,
    ServerEvent, SessionId, SignalKind, UserId,
};
