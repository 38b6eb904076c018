//! The connection registry: who is connected, and who is in which room.
//!
//! # Concurrency note
//!
//! `ConnectionRegistry` is NOT thread-safe by itself; it uses plain
//! `HashMap`s. The relay keeps it behind one async mutex and holds that
//! lock only for bookkeeping and membership snapshots, never across store
//! I/O.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use syncroom_protocol::{Recipient, RoomCode, SessionId, UserId};

use crate::{Outbound, Session, SessionError};

/// Outcome of a [`ConnectionRegistry::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Joined {
    /// The session was not a member before.
    New,
    /// The session was already a member; its user id was replaced.
    Rejoined { previous: UserId },
}

/// One room a session was removed from by a leave or a disconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_code: RoomCode,
    /// The user id recorded for the session in that room.
    pub user_id: UserId,
    /// No member is left in the room.
    pub vacated: bool,
}

/// Tracks every connected session and the derived room memberships.
///
/// ```text
/// connect() ──→ join(room) ──→ leave(room) / disconnect()
///                  │
///                  ▼
///        members[room] += session
/// ```
///
/// Memberships exist only in memory and are never persisted. A room's
/// member set is created on first join and removed once it empties.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<SessionId, Session>,
    members: HashMap<RoomCode, HashSet<SessionId>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its session id.
    ///
    /// `outbound` is where events for this connection are queued.
    pub fn connect(&mut self, outbound: Outbound) -> SessionId {
        let id = loop {
            let candidate = generate_session_id();
            if !self.sessions.contains_key(&candidate) {
                break candidate;
            }
        };
        self.sessions
            .insert(id.clone(), Session::new(id.clone(), outbound));
        tracing::debug!(session_id = %id, "session registered");
        id
    }

    /// Adds `session` to `room` as `user`.
    ///
    /// Joining a room the session is already in is not an error: the user
    /// id is overwritten and [`Joined::Rejoined`] is returned.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the session is unknown.
    pub fn join(
        &mut self,
        session: &SessionId,
        room: RoomCode,
        user: UserId,
    ) -> Result<Joined, SessionError> {
        let entry = self
            .sessions
            .get_mut(session)
            .ok_or_else(|| SessionError::NotFound(session.clone()))?;

        let previous = entry.insert_room(room.clone(), user);
        self.members
            .entry(room)
            .or_default()
            .insert(session.clone());

        Ok(match previous {
            Some(previous) => Joined::Rejoined { previous },
            None => Joined::New,
        })
    }

    /// Removes `session` from `room`.
    ///
    /// Returns `None` if the session was not a member (including an unknown
    /// session). Never an error.
    pub fn leave(&mut self, session: &SessionId, room: &RoomCode) -> Option<Departure> {
        let user_id = self.sessions.get_mut(session)?.remove_room(room)?;
        let vacated = self.remove_member(room, session);
        Some(Departure {
            room_code: room.clone(),
            user_id,
            vacated,
        })
    }

    /// Removes the session and every membership it held.
    ///
    /// Returns one [`Departure`] per room so the caller can announce the
    /// leave. A session that joined with an empty user id is announced by
    /// its session id instead.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the session is unknown.
    pub fn disconnect(&mut self, session: &SessionId) -> Result<Vec<Departure>, SessionError> {
        let mut entry = self
            .sessions
            .remove(session)
            .ok_or_else(|| SessionError::NotFound(session.clone()))?;

        let rooms: Vec<(RoomCode, UserId)> = entry.drain_rooms().collect();
        let departures: Vec<Departure> = rooms
            .into_iter()
            .map(|(room_code, user_id)| {
                let user_id = if user_id.as_str().is_empty() {
                    UserId(session.as_str().to_owned())
                } else {
                    user_id
                };
                let vacated = self.remove_member(&room_code, session);
                Departure { room_code, user_id, vacated }
            })
            .collect();

        tracing::debug!(
            session_id = %session,
            rooms = departures.len(),
            "session removed"
        );
        Ok(departures)
    }

    /// Snapshot of the outbound senders selected by `recipient` in `room`.
    ///
    /// The snapshot is taken now; a session joining after this call does
    /// not receive whatever the caller sends with it.
    pub fn recipients(&self, room: &RoomCode, recipient: &Recipient) -> Vec<Outbound> {
        let Some(members) = self.members.get(room) else {
            return Vec::new();
        };
        members
            .iter()
            .filter(|id| recipient.includes(id))
            .filter_map(|id| self.sessions.get(id))
            .map(Session::outbound)
            .collect()
    }

    /// The outbound sender of one session, regardless of room.
    pub fn outbound(&self, session: &SessionId) -> Option<Outbound> {
        self.sessions.get(session).map(Session::outbound)
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.members.len()
    }

    /// Number of connected sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no session is connected.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Returns `true` when this removal emptied the room.
    fn remove_member(&mut self, room: &RoomCode, session: &SessionId) -> bool {
        let Some(members) = self.members.get_mut(room) else {
            return false;
        };
        members.remove(session);
        if members.is_empty() {
            self.members.remove(room);
            return true;
        }
        false
    }
}

/// Generates a random 20-character hex session id (80 bits), the same
/// length clients are used to from socket ids.
fn generate_session_id() -> SessionId {
    let bytes: [u8; 10] = rand::rng().random();
    SessionId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `ConnectionRegistry`, named
    //! `test_{function}_{scenario}_{expected}`.

    use syncroom_protocol::ServerEvent;
    use tokio::sync::mpsc;

    use super::*;

    fn room(code: &str) -> RoomCode {
        RoomCode::from(code)
    }

    fn user(id: &str) -> UserId {
        UserId::from(id)
    }

    fn members(reg: &ConnectionRegistry, code: &str) -> Vec<SessionId> {
        reg.members
            .get(&room(code))
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn user_of(reg: &ConnectionRegistry, session: &SessionId, code: &str) -> Option<UserId> {
        reg.sessions.get(session)?.user_in(&room(code)).cloned()
    }

    /// Connects a session and keeps its receiving end.
    fn connect(
        reg: &mut ConnectionRegistry,
    ) -> (SessionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (reg.connect(tx), rx)
    }

    #[test]
    fn test_connect_assigns_unique_hex_ids() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        let (b, _rb) = connect(&mut reg);

        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 20);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_join_new_member_creates_room() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);

        let joined = reg.join(&a, room("AB12"), user("alice")).unwrap();

        assert_eq!(joined, Joined::New);
        assert_eq!(members(&reg, "AB12"), vec![a.clone()]);
        assert_eq!(user_of(&reg, &a, "AB12"), Some(user("alice")));
    }

    #[test]
    fn test_join_twice_overwrites_user_id() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        reg.join(&a, room("AB12"), user("alice")).unwrap();

        let joined = reg.join(&a, room("AB12"), user("alice-2")).unwrap();

        assert_eq!(joined, Joined::Rejoined { previous: user("alice") });
        assert_eq!(members(&reg, "AB12").len(), 1);
        assert_eq!(user_of(&reg, &a, "AB12"), Some(user("alice-2")));
    }

    #[test]
    fn test_join_unknown_session_returns_not_found() {
        let mut reg = ConnectionRegistry::new();
        let result = reg.join(&SessionId::from("ghost"), room("AB12"), user("u"));
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_leave_non_member_is_noop() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);

        assert_eq!(reg.leave(&a, &room("AB12")), None);
        assert_eq!(reg.leave(&SessionId::from("ghost"), &room("AB12")), None);
    }

    #[test]
    fn test_leave_last_member_prunes_room() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        reg.join(&a, room("AB12"), user("alice")).unwrap();

        assert_eq!(
            reg.leave(&a, &room("AB12")),
            Some(Departure { room_code: room("AB12"), user_id: user("alice"), vacated: true })
        );
        assert_eq!(reg.room_count(), 0);
        assert_eq!(user_of(&reg, &a, "AB12"), None);
    }

    #[test]
    fn test_leave_with_members_remaining_is_not_vacated() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        let (b, _rb) = connect(&mut reg);
        reg.join(&a, room("AB12"), user("alice")).unwrap();
        reg.join(&b, room("AB12"), user("bob")).unwrap();

        let departure = reg.leave(&a, &room("AB12")).unwrap();
        assert!(!departure.vacated);
        assert_eq!(members(&reg, "AB12"), vec![b]);
    }

    #[test]
    fn test_disconnect_reports_every_room() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        let (b, _rb) = connect(&mut reg);
        reg.join(&a, room("A"), user("alice")).unwrap();
        reg.join(&a, room("B"), user("alice")).unwrap();
        reg.join(&b, room("A"), user("bob")).unwrap();

        let mut departures = reg.disconnect(&a).unwrap();
        departures.sort_by(|x, y| x.room_code.as_str().cmp(y.room_code.as_str()));

        assert_eq!(
            departures,
            vec![
                Departure { room_code: room("A"), user_id: user("alice"), vacated: false },
                Departure { room_code: room("B"), user_id: user("alice"), vacated: true },
            ]
        );
        assert_eq!(members(&reg, "A"), vec![b]);
        assert!(members(&reg, "B").is_empty());
        assert!(!reg.sessions.contains_key(&a));
    }

    #[test]
    fn test_disconnect_empty_user_id_falls_back_to_session_id() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        reg.join(&a, room("A"), user("")).unwrap();

        let departures = reg.disconnect(&a).unwrap();
        assert_eq!(departures[0].user_id.as_str(), a.as_str());
    }

    #[test]
    fn test_disconnect_twice_returns_not_found() {
        let mut reg = ConnectionRegistry::new();
        let (a, _ra) = connect(&mut reg);
        reg.disconnect(&a).unwrap();
        assert!(matches!(reg.disconnect(&a), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_recipients_all_except_skips_sender() {
        let mut reg = ConnectionRegistry::new();
        let (a, mut ra) = connect(&mut reg);
        let (b, mut rb) = connect(&mut reg);
        let (c, mut rc) = connect(&mut reg);
        reg.join(&a, room("AB12"), user("a")).unwrap();
        reg.join(&b, room("AB12"), user("b")).unwrap();
        reg.join(&c, room("OTHER"), user("c")).unwrap();

        let targets = reg.recipients(&room("AB12"), &Recipient::AllExcept(a));
        assert_eq!(targets.len(), 1);
        for tx in targets {
            tx.send(ServerEvent::RoomEnded).unwrap();
        }

        assert!(ra.try_recv().is_err());
        assert_eq!(rb.try_recv().unwrap(), ServerEvent::RoomEnded);
        assert!(rc.try_recv().is_err());
    }

    #[test]
    fn test_recipients_unknown_room_is_empty() {
        let reg = ConnectionRegistry::new();
        assert!(reg.recipients(&room("none"), &Recipient::All).is_empty());
    }
}
