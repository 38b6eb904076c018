//! Room termination.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use syncroom_protocol::{RoomCode, UserId};
use syncroom_store::{RoomFilter, RoomPatch, RoomStore};
use tokio::sync::Mutex;

use crate::{RelayDispatcher, RoomCoordinator, RoomError};

/// Result of an [`LifecycleManager::end_room`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    /// The room was ended by this call and `room-ended` went out.
    Ended,
    /// No active record exists for the code. A room that was already ended
    /// lands here.
    NotFound,
    /// The requester is not the room's host.
    NotHost,
}

/// Serializes end requests for one room code while any are in flight.
type Gate = Arc<Mutex<()>>;

/// Performs the one-way `Active → Ended` transition of a room.
///
/// ```text
/// end_room ──→ lock room gate ──→ find active ──→ host? ──→ room-ended ──→ patch
///                                      │            │
///                                    absent       no: audit log
///                                      ▼            ▼
///                                  NotFound      NotHost
/// ```
///
/// Requests for the same room run one at a time behind that room's gate.
/// The closing patch commits before the gate is released, so a queued
/// duplicate finds no active record and emits nothing. The gate is dropped
/// once no request for the code is waiting on it, which leaves the code
/// free for a later active record.
pub struct LifecycleManager<S: RoomStore> {
    coordinator: Arc<RoomCoordinator<S>>,
    relay: RelayDispatcher,
    gates: Mutex<HashMap<RoomCode, Gate>>,
    rejected: AtomicU64,
}

impl<S: RoomStore> LifecycleManager<S> {
    pub fn new(coordinator: Arc<RoomCoordinator<S>>, relay: RelayDispatcher) -> Self {
        Self {
            coordinator,
            relay,
            gates: Mutex::new(HashMap::new()),
            rejected: AtomicU64::new(0),
        }
    }

    /// Ends `room` on behalf of `requester`.
    ///
    /// Only the host recorded on the active room record may end it. Every
    /// refusal is silent toward clients. On success every member receives
    /// `room-ended` before the store patch `{isActive: false, endedAt,
    /// updatedAt}` is written.
    ///
    /// # Errors
    /// Returns [`RoomError::Store`] if the lookup or the closing patch
    /// fails. When the closing patch fails the record stays active, so a
    /// retry by the host ends it again.
    pub async fn end_room(&self, room: &RoomCode, requester: &UserId) -> Result<EndOutcome, RoomError> {
        let gate = self.acquire_gate(room).await;
        let outcome = {
            let _serialized = gate.lock().await;
            self.end_serialized(room, requester).await
        };
        self.release_gate(room, gate).await;
        outcome
    }

    /// Number of end requests refused because the requester was not the host.
    pub fn rejected_end_requests(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    async fn end_serialized(&self, room: &RoomCode, requester: &UserId) -> Result<EndOutcome, RoomError> {
        let Some(record) = self.coordinator.store().find_active_room(room).await? else {
            tracing::debug!(room_code = %room, user_id = %requester, "end-room for unknown or inactive room");
            return Ok(EndOutcome::NotFound);
        };

        if !record.is_hosted_by(requester) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                target: "syncroom::audit",
                room_code = %room,
                user_id = %requester,
                "end-room rejected: requester is not the host"
            );
            return Ok(EndOutcome::NotHost);
        }

        let notified = self.relay.room_ended(room).await;
        self.coordinator.evict(room).await;

        let now = SystemTime::now();
        self.coordinator
            .store()
            .patch_room(RoomFilter::ByCode(room.clone()), RoomPatch::end(now))
            .await?;

        tracing::info!(room_code = %room, user_id = %requester, notified, "room ended by host");
        Ok(EndOutcome::Ended)
    }

    async fn acquire_gate(&self, room: &RoomCode) -> Gate {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(room.clone()).or_default())
    }

    /// Drops the room's gate unless another request still holds a handle.
    async fn release_gate(&self, room: &RoomCode, gate: Gate) {
        let mut gates = self.gates.lock().await;
        // One handle in the map, one here.
        if Arc::strong_count(&gate) == 2 {
            gates.remove(room);
        }
    }
}
