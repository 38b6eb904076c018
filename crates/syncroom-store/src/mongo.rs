//! MongoDB-backed room store.
//!
//! The collection handle is created on first use and then shared by every
//! caller. `OnceCell::get_or_try_init` makes that single-flight: concurrent
//! first callers wait on the one connect attempt instead of racing their
//! own. A failed attempt leaves the cell empty, so the next call retries.

use mongodb::bson::{self, Bson, Document, doc};
use mongodb::{Client, Collection};
use serde::Deserialize;
use syncroom_protocol::{RoomCode, UserId};
use tokio::sync::OnceCell;

use crate::{PatchAck, RoomFilter, RoomPatch, RoomRecord, RoomStore, StoreError};

/// Where the room collection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    /// Connection string, e.g. `mongodb://localhost:27017`.
    pub uri: String,
    /// Database name.
    pub database: String,
    /// Collection holding the room records.
    pub collection: String,
}

impl MongoConfig {
    /// Config for `uri` with the default `MV-LIVE` / `rooms` names.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: "MV-LIVE".to_string(),
            collection: "rooms".to_string(),
        }
    }
}

/// A room record as stored in MongoDB. Unknown fields (e.g. `_id`,
/// `videoUrl`) are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomDocument {
    room_code: String,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    host_id: Option<Bson>,
    #[serde(default)]
    current_time: Option<f64>,
    #[serde(default)]
    is_playing: Option<bool>,
    #[serde(default)]
    updated_at: Option<bson::DateTime>,
    #[serde(default)]
    ended_at: Option<bson::DateTime>,
}

impl From<RoomDocument> for RoomRecord {
    fn from(doc: RoomDocument) -> Self {
        // Host ids are compared as strings; any other BSON type can never
        // match a client-supplied user id.
        let host_id = match doc.host_id {
            Some(Bson::String(s)) => Some(UserId(s)),
            _ => None,
        };
        Self {
            room_code: RoomCode(doc.room_code),
            is_active: doc.is_active,
            host_id,
            current_time: doc.current_time,
            is_playing: doc.is_playing,
            updated_at: doc.updated_at.map(|t| t.to_system_time()),
            ended_at: doc.ended_at.map(|t| t.to_system_time()),
        }
    }
}

/// A [`RoomStore`] over a MongoDB collection.
pub struct MongoRoomStore {
    config: MongoConfig,
    rooms: OnceCell<Collection<RoomDocument>>,
}

impl MongoRoomStore {
    /// Creates the store without connecting.
    pub fn new(config: MongoConfig) -> Self {
        Self {
            config,
            rooms: OnceCell::new(),
        }
    }

    /// Connects now instead of on the first request.
    ///
    /// # Errors
    /// Returns the driver error if the server can't be reached.
    pub async fn connect(&self) -> Result<(), StoreError> {
        self.collection().await.map(|_| ())
    }

    async fn collection(&self) -> Result<&Collection<RoomDocument>, StoreError> {
        self.rooms
            .get_or_try_init(|| async {
                let client = Client::with_uri_str(&self.config.uri).await?;
                let db = client.database(&self.config.database);
                // The driver connects lazily; ping so a bad URI fails here.
                db.run_command(doc! { "ping": 1 }).await?;
                tracing::info!(
                    database = %self.config.database,
                    collection = %self.config.collection,
                    "connected to MongoDB"
                );
                Ok::<_, StoreError>(db.collection::<RoomDocument>(&self.config.collection))
            })
            .await
    }
}

fn filter_document(filter: &RoomFilter) -> Document {
    match filter {
        RoomFilter::ByCode(code) => doc! { "roomCode": code.as_str() },
        RoomFilter::ActiveByCode(code) => {
            doc! { "roomCode": code.as_str(), "isActive": true }
        }
    }
}

fn set_document(patch: &RoomPatch) -> Document {
    let mut set = Document::new();
    if let Some(v) = patch.is_active {
        set.insert("isActive", v);
    }
    if let Some(v) = patch.current_time {
        set.insert("currentTime", v);
    }
    if let Some(v) = patch.is_playing {
        set.insert("isPlaying", v);
    }
    if let Some(v) = patch.updated_at {
        set.insert("updatedAt", bson::DateTime::from_system_time(v));
    }
    if let Some(v) = patch.ended_at {
        set.insert("endedAt", bson::DateTime::from_system_time(v));
    }
    set
}

impl RoomStore for MongoRoomStore {
    async fn find_active_room(
        &self,
        room_code: &RoomCode,
    ) -> Result<Option<RoomRecord>, StoreError> {
        let rooms = self.collection().await?;
        let filter = filter_document(&RoomFilter::ActiveByCode(room_code.clone()));
        let found = rooms.find_one(filter).await?;
        Ok(found.map(RoomRecord::from))
    }

    async fn patch_room(
        &self,
        filter: RoomFilter,
        patch: RoomPatch,
    ) -> Result<PatchAck, StoreError> {
        let rooms = self.collection().await?;
        let update = doc! { "$set": set_document(&patch) };
        match filter {
            RoomFilter::ActiveByCode(_) => {
                let result = rooms.update_one(filter_document(&filter), update).await?;
                Ok(PatchAck {
                    matched: result.matched_count,
                    modified: result.modified_count,
                })
            }
            // Several records may share a code; the active one sorts first.
            RoomFilter::ByCode(_) => {
                let before = rooms
                    .find_one_and_update(filter_document(&filter), update)
                    .sort(doc! { "isActive": -1 })
                    .await?;
                let matched = u64::from(before.is_some());
                Ok(PatchAck { matched, modified: matched })
            }
        }
    }
}
