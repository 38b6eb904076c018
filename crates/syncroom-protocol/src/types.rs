//! Core protocol types for syncroom's wire format.
//!
//! Everything here travels "on the wire": a frame is one JSON object of the
//! shape `{"event": "<name>", "data": {...}}`. Event names are kebab-case
//! and field names camelCase, matching what existing browser clients send.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The short code that identifies a room, e.g. `"AB12"`.
///
/// Room codes are created by whoever creates the durable room record; the
/// relay never generates one. `#[serde(transparent)]` keeps it a plain JSON
/// string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

/// A user identifier as supplied by the client.
///
/// Not authenticated: the relay trusts whatever the client sends on join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifies one connection session on this server.
///
/// Signaling relays are annotated with it so peers can answer the right
/// connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

macro_rules! string_id {
    ($($ty:ident),*) => {$(
        impl $ty {
            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $ty {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    )*};
}

string_id!(RoomCode, UserId, SessionId);

// ---------------------------------------------------------------------------
// Playback
// ---------------------------------------------------------------------------

/// A playback control action.
///
/// Anything other than these three fails to decode, so an unknown action
/// never reaches the store or the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackAction {
    Play,
    Pause,
    Seek,
}

impl fmt::Display for PlaybackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek => "seek",
        })
    }
}

/// The shared playback position: offset in seconds plus the playing flag.
///
/// This is also the body of a `video-sync` event.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub current_time: f64,
    pub is_playing: bool,
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an outbound event?
// ---------------------------------------------------------------------------

/// Selects which members of a room receive an outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every member of the room, the originator included.
    All,

    /// Every member except the given session. This is the default for
    /// relayed traffic: the sender already has its own copy.
    AllExcept(SessionId),
}

impl Recipient {
    /// Returns `true` if `session` is selected by this recipient.
    pub fn includes(&self, session: &SessionId) -> bool {
        match self {
            Self::All => true,
            Self::AllExcept(excluded) => excluded != session,
        }
    }
}

/// The three WebRTC negotiation message kinds the relay forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

// ---------------------------------------------------------------------------
// ClientEvent: inbound
// ---------------------------------------------------------------------------

/// An event sent by a client.
///
/// `#[serde(tag = "event", content = "data")]` gives the adjacently tagged
/// shape `{"event": "join-room", "data": {"roomCode": "AB12", "userId": "u1"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Join a room's membership and ask for its playback state.
    JoinRoom { room_code: RoomCode, user_id: UserId },

    /// Leave a room.
    LeaveRoom { room_code: RoomCode, user_id: UserId },

    /// Play, pause, or seek the shared video.
    ///
    /// `payload` is kept verbatim so it can be rebroadcast exactly as sent;
    /// the coordinator reads `currentTime` / `isPlaying` out of it.
    VideoControl {
        room_code: RoomCode,
        action: PlaybackAction,
        payload: Value,
    },

    /// A chat message. Its content is opaque to the relay.
    ChatMessage { room_code: RoomCode, message: Value },

    /// WebRTC offer for a peer.
    WebrtcOffer {
        room_code: RoomCode,
        payload: Value,
        #[serde(default)]
        target_user_id: Option<UserId>,
    },

    /// WebRTC answer for a peer.
    WebrtcAnswer {
        room_code: RoomCode,
        payload: Value,
        #[serde(default)]
        target_user_id: Option<UserId>,
    },

    /// A trickled ICE candidate for a peer.
    WebrtcIceCandidate {
        room_code: RoomCode,
        payload: Value,
        #[serde(default)]
        target_user_id: Option<UserId>,
    },

    /// The host ends the room for everyone.
    EndRoom { room_code: RoomCode, user_id: UserId },
}

impl ClientEvent {
    /// The room this event is addressed to.
    pub fn room_code(&self) -> &RoomCode {
        match self {
            Self::JoinRoom { room_code, .. }
            | Self::LeaveRoom { room_code, .. }
            | Self::VideoControl { room_code, .. }
            | Self::ChatMessage { room_code, .. }
            | Self::WebrtcOffer { room_code, .. }
            | Self::WebrtcAnswer { room_code, .. }
            | Self::WebrtcIceCandidate { room_code, .. }
            | Self::EndRoom { room_code, .. } => room_code,
        }
    }

    /// The wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join-room",
            Self::LeaveRoom { .. } => "leave-room",
            Self::VideoControl { .. } => "video-control",
            Self::ChatMessage { .. } => "chat-message",
            Self::WebrtcOffer { .. } => "webrtc-offer",
            Self::WebrtcAnswer { .. } => "webrtc-answer",
            Self::WebrtcIceCandidate { .. } => "webrtc-ice-candidate",
            Self::EndRoom { .. } => "end-room",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent: outbound
// ---------------------------------------------------------------------------

/// An event the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Another user joined the room.
    UserJoined { user_id: UserId },

    /// Another user left the room (explicitly or by disconnecting).
    UserLeft { user_id: UserId },

    /// Unicast to a joiner: the room's current playback state.
    VideoSync(PlaybackState),

    /// A playback action, relayed to the whole room including its sender.
    VideoControl { action: PlaybackAction, payload: Value },

    /// A chat message from another member.
    ChatMessage { message: Value },

    /// A relayed WebRTC offer. `from` is the sender's session.
    WebrtcOffer {
        payload: Value,
        from: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_id: Option<UserId>,
    },

    /// A relayed WebRTC answer.
    WebrtcAnswer {
        payload: Value,
        from: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_id: Option<UserId>,
    },

    /// A relayed ICE candidate.
    WebrtcIceCandidate {
        payload: Value,
        from: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_id: Option<UserId>,
    },

    /// The host ended the room. Clients must stop sending to it.
    RoomEnded,
}

impl ServerEvent {
    /// Builds the outbound relay of a signaling message.
    pub fn signal(
        kind: SignalKind,
        payload: Value,
        from: SessionId,
        target_user_id: Option<UserId>,
    ) -> Self {
        match kind {
            SignalKind::Offer => Self::WebrtcOffer { payload, from, target_user_id },
            SignalKind::Answer => Self::WebrtcAnswer { payload, from, target_user_id },
            SignalKind::IceCandidate => {
                Self::WebrtcIceCandidate { payload, from, target_user_id }
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
