//! The durable room record and the filter/patch values used to update it.

use std::time::SystemTime;

use syncroom_protocol::{PlaybackState, RoomCode, UserId};

/// One room as persisted in the room collection.
///
/// Records are created by the web app before anyone connects; the relay
/// only reads them and patches the fields below. Optional fields mirror
/// what a schemaless store can hand back.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomRecord {
    pub room_code: RoomCode,
    pub is_active: bool,
    pub host_id: Option<UserId>,
    pub current_time: Option<f64>,
    pub is_playing: Option<bool>,
    pub updated_at: Option<SystemTime>,
    pub ended_at: Option<SystemTime>,
}

impl RoomRecord {
    /// A freshly created, active room with no playback recorded yet.
    pub fn active(room_code: impl Into<RoomCode>, host_id: impl Into<UserId>) -> Self {
        Self {
            room_code: room_code.into(),
            is_active: true,
            host_id: Some(host_id.into()),
            current_time: None,
            is_playing: None,
            updated_at: None,
            ended_at: None,
        }
    }

    /// Sets the recorded playback fields.
    pub fn with_playback(mut self, current_time: f64, is_playing: bool) -> Self {
        self.current_time = Some(current_time);
        self.is_playing = Some(is_playing);
        self
    }

    /// The playback state a joiner should be synced to.
    ///
    /// Missing or non-finite offsets read as `0`, a missing flag as paused.
    pub fn playback(&self) -> PlaybackState {
        PlaybackState {
            current_time: self
                .current_time
                .filter(|t| t.is_finite())
                .unwrap_or(0.0),
            is_playing: self.is_playing.unwrap_or(false),
        }
    }

    /// Returns `true` if `user` is the recorded host.
    pub fn is_hosted_by(&self, user: &UserId) -> bool {
        self.host_id.as_ref() == Some(user)
    }
}

/// Selects which record a patch applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomFilter {
    /// Any record with this code, active or not. Used to end a room so the
    /// close-out also lands on a record that is already inactive. When an
    /// ended record and a newer active one share the code, stores patch the
    /// active one.
    ByCode(RoomCode),

    /// Only the active record with this code. Used for playback updates so
    /// an ended room is never revived by a late write.
    ActiveByCode(RoomCode),
}

impl RoomFilter {
    /// The room code the filter targets.
    pub fn room_code(&self) -> &RoomCode {
        match self {
            Self::ByCode(code) | Self::ActiveByCode(code) => code,
        }
    }

    /// Returns `true` if `record` is selected by this filter.
    pub fn matches(&self, record: &RoomRecord) -> bool {
        match self {
            Self::ByCode(code) => record.room_code == *code,
            Self::ActiveByCode(code) => record.room_code == *code && record.is_active,
        }
    }
}

/// A partial update: only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomPatch {
    pub is_active: Option<bool>,
    pub current_time: Option<f64>,
    pub is_playing: Option<bool>,
    pub updated_at: Option<SystemTime>,
    pub ended_at: Option<SystemTime>,
}

impl RoomPatch {
    /// Writes a playback state and bumps `updatedAt`.
    pub fn playback(state: PlaybackState, now: SystemTime) -> Self {
        Self {
            current_time: Some(state.current_time),
            is_playing: Some(state.is_playing),
            updated_at: Some(now),
            ..Self::default()
        }
    }

    /// Closes the room: `isActive = false`, `endedAt = updatedAt = now`.
    pub fn end(now: SystemTime) -> Self {
        Self {
            is_active: Some(false),
            updated_at: Some(now),
            ended_at: Some(now),
            ..Self::default()
        }
    }

    /// Applies the patch in place. Returns `true` if any field changed.
    pub fn apply_to(&self, record: &mut RoomRecord) -> bool {
        let before = record.clone();
        if let Some(v) = self.is_active {
            record.is_active = v;
        }
        if let Some(v) = self.current_time {
            record.current_time = Some(v);
        }
        if let Some(v) = self.is_playing {
            record.is_playing = Some(v);
        }
        if let Some(v) = self.updated_at {
            record.updated_at = Some(v);
        }
        if let Some(v) = self.ended_at {
            record.ended_at = Some(v);
        }
        *record != before
    }
}

/// Acknowledgement of a patch, in update-one terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchAck {
    /// Records selected by the filter (0 or 1).
    pub matched: u64,
    /// Records actually changed (0 or 1).
    pub modified: u64,
}
