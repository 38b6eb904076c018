//! The room coordinator: playback state rules and the durable sync contract.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use serde_json::Value;
use syncroom_protocol::{PlaybackAction, PlaybackState, RoomCode};
use syncroom_store::{RoomFilter, RoomPatch, RoomRecord, RoomStore};
use tokio::sync::Mutex;

use crate::RoomError;

/// Owns the playback rules for every room and keeps the store in step.
///
/// The coordinator writes through: an update is patched into the store
/// first and only a successful patch reaches the in-memory cache. The
/// caller broadcasts after [`apply_playback_update`](Self::apply_playback_update)
/// returns `Ok`.
///
/// Concurrent updates to one room are not ordered here. Whichever patch the
/// store commits last wins.
pub struct RoomCoordinator<S: RoomStore> {
    store: Arc<S>,

    /// Latest playback state known per room. Entries live while the room
    /// has members and is not ended.
    cache: Mutex<HashMap<RoomCode, PlaybackState>>,
}

impl<S: RoomStore> RoomCoordinator<S> {
    /// Creates a coordinator backed by `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Reads the active record for `room`, refreshing the cache from it.
    pub async fn snapshot(&self, room: &RoomCode) -> Result<Option<RoomRecord>, RoomError> {
        let record = self.store.find_active_room(room).await?;
        if let Some(record) = &record {
            self.cache
                .lock()
                .await
                .insert(room.clone(), record.playback());
        }
        Ok(record)
    }

    /// The playback state to push to a new joiner.
    ///
    /// `None` when the room has no active record; the joiner then gets no
    /// `video-sync` at all.
    pub async fn sync_for_join(&self, room: &RoomCode) -> Result<Option<PlaybackState>, RoomError> {
        Ok(self.snapshot(room).await?.map(|record| record.playback()))
    }

    /// Applies a `video-control` action to the room's durable state.
    ///
    /// Returns the state that was written. The room must still be active
    /// for the patch to match; a patch that matches nothing is not an
    /// error, so the action is still relayed.
    ///
    /// # Errors
    /// - [`RoomError::InvalidPayload`] when a seek lacks `currentTime` or
    ///   `isPlaying`. Nothing is written.
    /// - [`RoomError::Store`] when the patch fails.
    pub async fn apply_playback_update(
        &self,
        room: &RoomCode,
        action: PlaybackAction,
        payload: &Value,
    ) -> Result<PlaybackState, RoomError> {
        let state = playback_from_payload(action, payload)?;

        let ack = self
            .store
            .patch_room(
                RoomFilter::ActiveByCode(room.clone()),
                RoomPatch::playback(state, SystemTime::now()),
            )
            .await?;

        if ack.matched == 0 {
            tracing::debug!(room_code = %room, %action, "playback update matched no active room");
        } else {
            self.cache.lock().await.insert(room.clone(), state);
        }

        tracing::debug!(
            room_code = %room,
            %action,
            current_time = state.current_time,
            is_playing = state.is_playing,
            "playback updated"
        );
        Ok(state)
    }

    /// Drops the cached state of a room that ended or has no members left.
    pub async fn evict(&self, room: &RoomCode) {
        self.cache.lock().await.remove(room);
    }

    /// Number of rooms with a cached playback state.
    pub async fn cached_rooms(&self) -> usize {
        self.cache.lock().await.len()
    }
}

/// Derives the new playback state from an action and its payload.
///
/// - `play` / `pause`: `currentTime` defaults to 0 when absent or not a
///   number; the flag follows the action.
/// - `seek`: both `currentTime` and `isPlaying` must be present.
pub fn playback_from_payload(
    action: PlaybackAction,
    payload: &Value,
) -> Result<PlaybackState, RoomError> {
    match action {
        PlaybackAction::Play | PlaybackAction::Pause => Ok(PlaybackState {
            current_time: payload
                .get("currentTime")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            is_playing: action == PlaybackAction::Play,
        }),
        PlaybackAction::Seek => {
            let current_time = payload
                .get("currentTime")
                .and_then(Value::as_f64)
                .ok_or_else(|| RoomError::InvalidPayload("seek requires currentTime".into()))?;
            let is_playing = payload
                .get("isPlaying")
                .and_then(Value::as_bool)
                .ok_or_else(|| RoomError::InvalidPayload("seek requires isPlaying".into()))?;
            Ok(PlaybackState { current_time, is_playing })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use syncroom_store::MemoryRoomStore;

    use super::*;

    async fn cached<S: RoomStore>(coordinator: &RoomCoordinator<S>, room: &RoomCode) -> Option<PlaybackState> {
        coordinator.cache.lock().await.get(room).copied()
    }

    fn code() -> RoomCode {
        RoomCode::from("AB12")
    }

    #[test]
    fn test_playback_from_payload_play_without_time_defaults_to_zero() {
        let state = playback_from_payload(PlaybackAction::Play, &json!({})).unwrap();
        assert_eq!(state, PlaybackState { current_time: 0.0, is_playing: true });
    }

    #[test]
    fn test_playback_from_payload_pause_ignores_is_playing_field() {
        let state = playback_from_payload(
            PlaybackAction::Pause,
            &json!({"currentTime": 42.5, "isPlaying": true}),
        )
        .unwrap();
        assert_eq!(state, PlaybackState { current_time: 42.5, is_playing: false });
    }

    #[test]
    fn test_playback_from_payload_seek_missing_flag_is_invalid() {
        let result = playback_from_payload(PlaybackAction::Seek, &json!({"currentTime": 3}));
        assert!(matches!(result, Err(RoomError::InvalidPayload(_))));
    }

    #[test]
    fn test_playback_from_payload_seek_backwards_is_allowed() {
        let state = playback_from_payload(
            PlaybackAction::Seek,
            &json!({"currentTime": 1, "isPlaying": false}),
        )
        .unwrap();
        assert_eq!(state, PlaybackState { current_time: 1.0, is_playing: false });
    }

    #[tokio::test]
    async fn test_apply_playback_update_writes_and_caches() {
        let store = Arc::new(MemoryRoomStore::with_rooms([RoomRecord::active("AB12", "h")]));
        let coordinator = RoomCoordinator::new(Arc::clone(&store));

        let state = coordinator
            .apply_playback_update(&code(), PlaybackAction::Play, &json!({"currentTime": 12}))
            .await
            .unwrap();

        assert_eq!(cached(&coordinator, &code()).await, Some(state));
        let record = store.get(&code()).await.unwrap();
        assert_eq!(record.current_time, Some(12.0));
        assert_eq!(record.is_playing, Some(true));
        assert!(record.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_apply_playback_update_invalid_seek_writes_nothing() {
        let store = Arc::new(MemoryRoomStore::with_rooms([
            RoomRecord::active("AB12", "h").with_playback(5.0, true),
        ]));
        let coordinator = RoomCoordinator::new(Arc::clone(&store));

        let result = coordinator
            .apply_playback_update(&code(), PlaybackAction::Seek, &json!({"isPlaying": false}))
            .await;

        assert!(matches!(result, Err(RoomError::InvalidPayload(_))));
        assert_eq!(store.get(&code()).await.unwrap().playback().current_time, 5.0);
        assert_eq!(cached(&coordinator, &code()).await, None);
    }

    #[tokio::test]
    async fn test_apply_playback_update_inactive_room_does_not_cache() {
        let coordinator = RoomCoordinator::new(Arc::new(MemoryRoomStore::new()));

        let result = coordinator
            .apply_playback_update(&code(), PlaybackAction::Pause, &json!({"currentTime": 9}))
            .await;

        assert!(result.is_ok());
        assert_eq!(cached(&coordinator, &code()).await, None);
    }

    #[tokio::test]
    async fn test_sync_for_join_missing_record_returns_none() {
        let coordinator = RoomCoordinator::new(Arc::new(MemoryRoomStore::new()));
        assert_eq!(coordinator.sync_for_join(&code()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sync_for_join_unset_fields_default() {
        let store = Arc::new(MemoryRoomStore::with_rooms([RoomRecord::active("AB12", "h")]));
        let coordinator = RoomCoordinator::new(store);

        let state = coordinator.sync_for_join(&code()).await.unwrap();
        assert_eq!(state, Some(PlaybackState::default()));
        assert_eq!(cached(&coordinator, &code()).await, Some(PlaybackState::default()));
    }

    #[tokio::test]
    async fn test_evict_clears_cache() {
        let store = Arc::new(MemoryRoomStore::with_rooms([
            RoomRecord::active("AB12", "h").with_playback(10.0, false),
        ]));
        let coordinator = RoomCoordinator::new(store);
        coordinator.snapshot(&code()).await.unwrap();

        coordinator.evict(&code()).await;
        assert_eq!(cached(&coordinator, &code()).await, None);
    }
}
