//! Fan-out of events to room members.

use std::sync::Arc;

use serde_json::Value;
use syncroom_protocol::{
    PlaybackAction, Recipient, RoomCode, ServerEvent, SessionId, SignalKind, UserId,
};
use syncroom_session::{ConnectionRegistry, Departure, Joined, Outbound};
use tokio::sync::Mutex;

use crate::RoomError;

/// Delivers events to the members of a room.
///
/// Holds the shared [`ConnectionRegistry`]. Each delivery takes a snapshot
/// of the recipients under the registry lock, releases the lock, and then
/// pushes into each connection's unbounded outbound channel. No delivery
/// ever waits on a client.
///
/// Cloning is cheap: clones share the registry.
#[derive(Clone, Default)]
pub struct RelayDispatcher {
    registry: Arc<Mutex<ConnectionRegistry>>,
}

impl RelayDispatcher {
    /// Creates a dispatcher with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<Mutex<ConnectionRegistry>> {
        &self.registry
    }

    /// Registers a connection and returns its session id.
    pub async fn connect(&self, outbound: Outbound) -> SessionId {
        self.registry.lock().await.connect(outbound)
    }

    /// Records `session` as a member of `room` and tells the other members.
    pub async fn join(
        &self,
        session: &SessionId,
        room: &RoomCode,
        user: UserId,
    ) -> Result<Joined, RoomError> {
        let (joined, targets) = {
            let mut registry = self.registry.lock().await;
            let joined = registry.join(session, room.clone(), user.clone())?;
            let targets = registry.recipients(room, &Recipient::AllExcept(session.clone()));
            (joined, targets)
        };

        deliver(targets, &ServerEvent::UserJoined { user_id: user.clone() });
        tracing::info!(room_code = %room, user_id = %user, session_id = %session, "user joined room");
        Ok(joined)
    }

    /// Removes `session` from `room` and tells the remaining members that
    /// `user` left.
    ///
    /// Returns `None`, and announces nothing, if the session was not a
    /// member.
    pub async fn leave(&self, session: &SessionId, room: &RoomCode, user: UserId) -> Option<Departure> {
        let (departure, targets) = {
            let mut registry = self.registry.lock().await;
            let departure = registry.leave(session, room)?;
            (departure, registry.recipients(room, &Recipient::All))
        };

        deliver(targets, &ServerEvent::UserLeft { user_id: user.clone() });
        tracing::info!(room_code = %room, user_id = %user, session_id = %session, "user left room");
        Some(departure)
    }

    /// Tears down a connection: drops the session and announces a
    /// `user-left` in every room it was still in.
    ///
    /// The departed session is gone from the registry before any
    /// announcement goes out, so it receives none of them.
    pub async fn disconnect(&self, session: &SessionId) -> Result<Vec<Departure>, RoomError> {
        let announcements: Vec<(Departure, Vec<Outbound>)> = {
            let mut registry = self.registry.lock().await;
            let departures = registry.disconnect(session)?;
            departures
                .into_iter()
                .map(|departure| {
                    let targets = registry.recipients(&departure.room_code, &Recipient::All);
                    (departure, targets)
                })
                .collect()
        };

        let mut departures = Vec::with_capacity(announcements.len());
        for (departure, targets) in announcements {
            deliver(
                targets,
                &ServerEvent::UserLeft { user_id: departure.user_id.clone() },
            );
            tracing::info!(
                room_code = %departure.room_code,
                user_id = %departure.user_id,
                session_id = %session,
                "user left room on disconnect"
            );
            departures.push(departure);
        }
        Ok(departures)
    }

    /// Sends `event` to the members of `room` selected by `recipient`.
    ///
    /// Returns how many connections it was queued for.
    pub async fn send_to(&self, room: &RoomCode, recipient: &Recipient, event: &ServerEvent) -> usize {
        let targets = self.registry.lock().await.recipients(room, recipient);
        deliver(targets, event)
    }

    /// Sends `event` to one session, whatever rooms it is in.
    pub async fn unicast(&self, session: &SessionId, event: ServerEvent) -> bool {
        let Some(outbound) = self.registry.lock().await.outbound(session) else {
            return false;
        };
        outbound.send(event).is_ok()
    }

    /// Relays a chat message to every other member.
    pub async fn chat(&self, room: &RoomCode, from: &SessionId, message: Value) -> usize {
        self.send_to(
            room,
            &Recipient::AllExcept(from.clone()),
            &ServerEvent::ChatMessage { message },
        )
        .await
    }

    /// Relays a signaling message to every other member, tagged with the
    /// sender's session id.
    ///
    /// `target` is passed through for clients to filter on; it does not
    /// narrow the delivery.
    pub async fn signal(
        &self,
        room: &RoomCode,
        kind: SignalKind,
        from: &SessionId,
        payload: Value,
        target: Option<UserId>,
    ) -> usize {
        let event = ServerEvent::signal(kind, payload, from.clone(), target);
        self.send_to(room, &Recipient::AllExcept(from.clone()), &event)
            .await
    }

    /// Relays a playback action to the whole room, the originator included.
    pub async fn playback(&self, room: &RoomCode, action: PlaybackAction, payload: Value) -> usize {
        self.send_to(room, &Recipient::All, &ServerEvent::VideoControl { action, payload })
            .await
    }

    /// Tells every member the room has ended.
    pub async fn room_ended(&self, room: &RoomCode) -> usize {
        self.send_to(room, &Recipient::All, &ServerEvent::RoomEnded)
            .await
    }
}

/// Queues `event` on every target. A closed channel means that connection
/// is tearing down; it is skipped.
fn deliver(targets: Vec<Outbound>, event: &ServerEvent) -> usize {
    targets
        .into_iter()
        .filter(|tx| tx.send(event.clone()).is_ok())
        .count()
}
