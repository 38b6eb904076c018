//! A single connection session and its room memberships.

use std::collections::HashMap;

use syncroom_protocol::{RoomCode, ServerEvent, SessionId, UserId};
use tokio::sync::mpsc;

/// Channel sender for delivering outbound events to one connection.
///
/// Unbounded so a broadcast never waits on a slow reader; the connection's
/// writer task drains it.
pub type Outbound = mpsc::UnboundedSender<ServerEvent>;

/// One connected client.
#[derive(Debug)]
pub struct Session {
    /// The session's identifier.
    pub id: SessionId,

    outbound: Outbound,

    /// Rooms this session joined, with the user id it announced in each.
    rooms: HashMap<RoomCode, UserId>,
}

impl Session {
    pub(crate) fn new(id: SessionId, outbound: Outbound) -> Self {
        Self {
            id,
            outbound,
            rooms: HashMap::new(),
        }
    }

    /// The user id the session announced in `room`, if it is a member.
    #[cfg(test)]
    pub(crate) fn user_in(&self, room: &RoomCode) -> Option<&UserId> {
        self.rooms.get(room)
    }

    /// A clone of the outbound sender.
    pub fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }

    pub(crate) fn insert_room(&mut self, room: RoomCode, user: UserId) -> Option<UserId> {
        self.rooms.insert(room, user)
    }

    pub(crate) fn remove_room(&mut self, room: &RoomCode) -> Option<UserId> {
        self.rooms.remove(room)
    }

    pub(crate) fn drain_rooms(&mut self) -> impl Iterator<Item = (RoomCode, UserId)> + '_ {
        self.rooms.drain()
    }
}
