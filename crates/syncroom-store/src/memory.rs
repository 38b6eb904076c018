//! In-process room store, used by tests and local development.

use syncroom_protocol::RoomCode;
use tokio::sync::RwLock;

use crate::{PatchAck, RoomFilter, RoomPatch, RoomRecord, RoomStore, StoreError};

/// A [`RoomStore`] that keeps records in a `Vec` behind an async lock.
///
/// Records are scanned in insertion order, so it behaves like an
/// unindexed collection: duplicates are allowed and the first match wins,
/// except that a patch prefers an active match over an inactive one.
#[derive(Debug, Default)]
pub struct MemoryRoomStore {
    records: RwLock<Vec<RoomRecord>>,
}

impl MemoryRoomStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    pub fn with_rooms(records: impl IntoIterator<Item = RoomRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Inserts a record, standing in for the web app that creates rooms.
    pub async fn insert(&self, record: RoomRecord) {
        self.records.write().await.push(record);
    }

    /// Returns the first record with `room_code`, active or not.
    pub async fn get(&self, room_code: &RoomCode) -> Option<RoomRecord> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.room_code == *room_code)
            .cloned()
    }
}

impl RoomStore for MemoryRoomStore {
    async fn find_active_room(
        &self,
        room_code: &RoomCode,
    ) -> Result<Option<RoomRecord>, StoreError> {
        let filter = RoomFilter::ActiveByCode(room_code.clone());
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| filter.matches(r))
            .cloned())
    }

    async fn patch_room(
        &self,
        filter: RoomFilter,
        patch: RoomPatch,
    ) -> Result<PatchAck, StoreError> {
        let mut records = self.records.write().await;
        let target = records
            .iter()
            .position(|r| r.is_active && filter.matches(r))
            .or_else(|| records.iter().position(|r| filter.matches(r)));
        let Some(record) = target.map(|i| &mut records[i]) else {
            return Ok(PatchAck::default());
        };
        let modified = patch.apply_to(record);
        Ok(PatchAck {
            matched: 1,
            modified: u64::from(modified),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use syncroom_protocol::PlaybackState;

    use super::*;

    fn code(s: &str) -> RoomCode {
        RoomCode::from(s)
    }

    #[tokio::test]
    async fn test_find_active_room_missing_returns_none() {
        let store = MemoryRoomStore::new();
        assert!(store.find_active_room(&code("AB12")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_active_room_skips_ended_duplicate() {
        let mut ended = RoomRecord::active("AB12", "old-host");
        ended.is_active = false;
        let store = MemoryRoomStore::with_rooms([
            ended,
            RoomRecord::active("AB12", "new-host"),
        ]);

        let found = store.find_active_room(&code("AB12")).await.unwrap().unwrap();
        assert_eq!(found.host_id.unwrap().as_str(), "new-host");
    }

    #[tokio::test]
    async fn test_patch_room_active_filter_ignores_inactive() {
        let mut ended = RoomRecord::active("AB12", "host");
        ended.is_active = false;
        let store = MemoryRoomStore::with_rooms([ended]);

        let state = PlaybackState { current_time: 3.0, is_playing: true };
        let ack = store
            .patch_room(
                RoomFilter::ActiveByCode(code("AB12")),
                RoomPatch::playback(state, SystemTime::now()),
            )
            .await
            .unwrap();

        assert_eq!(ack, PatchAck { matched: 0, modified: 0 });
        assert_eq!(store.get(&code("AB12")).await.unwrap().current_time, None);
    }

    #[tokio::test]
    async fn test_patch_room_by_code_reaches_inactive() {
        let mut ended = RoomRecord::active("AB12", "host");
        ended.is_active = false;
        let store = MemoryRoomStore::with_rooms([ended]);

        let ack = store
            .patch_room(
                RoomFilter::ByCode(code("AB12")),
                RoomPatch::end(SystemTime::now()),
            )
            .await
            .unwrap();

        assert_eq!(ack.matched, 1);
        assert!(store.get(&code("AB12")).await.unwrap().ended_at.is_some());
    }

    #[tokio::test]
    async fn test_patch_room_by_code_prefers_active_over_ended_duplicate() {
        let mut ended = RoomRecord::active("AB12", "old-host");
        ended.is_active = false;
        let store = MemoryRoomStore::with_rooms([ended, RoomRecord::active("AB12", "new-host")]);

        let ack = store
            .patch_room(RoomFilter::ByCode(code("AB12")), RoomPatch::end(SystemTime::now()))
            .await
            .unwrap();

        assert_eq!(ack.matched, 1);
        assert!(store.find_active_room(&code("AB12")).await.unwrap().is_none());
        let old = store.get(&code("AB12")).await.unwrap();
        assert_eq!(old.host_id.unwrap().as_str(), "old-host");
        assert_eq!(old.ended_at, None);
    }
}
