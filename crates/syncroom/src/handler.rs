//! Per-connection handler: registration, event dispatch, and teardown.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register a session and start the writer task for outbound events
//!   2. Loop: receive frames → decode a `ClientEvent` → dispatch it
//!   3. On close, the session guard removes the session and announces
//!      `user-left` in every room it was still in

use std::sync::Arc;

use syncroom_protocol::{ClientEvent, Codec, ServerEvent, SessionId, SignalKind};
use syncroom_session::Joined;
use syncroom_store::RoomStore;
use syncroom_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::SyncroomError;
use crate::server::ServerState;

/// Drop guard that tears the session down when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, the async teardown runs as a fire-and-forget task.
struct SessionGuard<S: RoomStore, C: Codec> {
    session_id: SessionId,
    state: Arc<ServerState<S, C>>,
}

impl<S: RoomStore, C: Codec> Drop for SessionGuard<S, C> {
    fn drop(&mut self) {
        let session_id = self.session_id.clone();
        let state = Arc::clone(&self.state);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        runtime.spawn(async move {
            match state.relay.disconnect(&session_id).await {
                Ok(departures) => {
                    for departure in departures.iter().filter(|d| d.vacated) {
                        state.coordinator.evict(&departure.room_code).await;
                    }
                    tracing::info!(%session_id, rooms = departures.len(), "client disconnected");
                }
                Err(e) => {
                    tracing::debug!(%session_id, error = %e, "session already removed");
                }
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(conn: WebSocketConnection, state: Arc<ServerState<S, C>>)
where
    S: RoomStore,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();

    let (outbound, mut events) = mpsc::unbounded_channel::<ServerEvent>();
    let session_id = state.relay.connect(outbound).await;
    let _guard = SessionGuard {
        session_id: session_id.clone(),
        state: Arc::clone(&state),
    };
    tracing::info!(%conn_id, %session_id, peer = %conn.peer_addr(), "client connected");

    // Outbound events are written by their own task so a broadcast never
    // waits behind this connection's reads.
    let writer = {
        let conn = Arc::clone(&conn);
        let state = Arc::clone(&state);
        let session_id = session_id.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let bytes = match state.codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(%session_id, error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(%session_id, error = %e, "send failed, stopping writer");
                    break;
                }
            }
        })
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%session_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "recv error");
                break;
            }
        };

        let event: ClientEvent = match state.codec.decode(&data) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "failed to decode event");
                continue;
            }
        };

        let name = event.name();
        let room_code = event.room_code().clone();
        if let Err(e) = dispatch(&state, &session_id, event).await {
            tracing::warn!(
                %session_id,
                %room_code,
                event = name,
                error = %e,
                "event handling failed"
            );
        }
    }

    writer.abort();
    // The peer usually closed first; a failed close is expected then.
    if let Err(e) = conn.close().await {
        tracing::trace!(%session_id, error = %e, "close after disconnect");
    }
    // _guard drops here → session teardown fires.
}

/// Routes one client event to the room layer.
///
/// Errors are returned for logging only; nothing is reported to the client.
async fn dispatch<S, C>(
    state: &ServerState<S, C>,
    session_id: &SessionId,
    event: ClientEvent,
) -> Result<(), SyncroomError>
where
    S: RoomStore,
    C: Codec,
{
    match event {
        ClientEvent::JoinRoom { room_code, user_id } => {
            if let Joined::Rejoined { previous } = state.relay.join(session_id, &room_code, user_id).await? {
                tracing::debug!(%session_id, %room_code, previous_user_id = %previous, "session re-joined room");
            }
            // Membership is recorded before the state sync is read.
            match state.coordinator.sync_for_join(&room_code).await? {
                Some(playback) => {
                    state
                        .relay
                        .unicast(session_id, ServerEvent::VideoSync(playback))
                        .await;
                }
                None => {
                    tracing::debug!(%session_id, %room_code, "no active room record, sync skipped");
                }
            }
        }

        ClientEvent::LeaveRoom { room_code, user_id } => {
            match state.relay.leave(session_id, &room_code, user_id).await {
                Some(departure) if departure.vacated => state.coordinator.evict(&room_code).await,
                Some(_) => {}
                None => tracing::debug!(%session_id, %room_code, "leave from non-member ignored"),
            }
        }

        ClientEvent::VideoControl { room_code, action, payload } => {
            state
                .coordinator
                .apply_playback_update(&room_code, action, &payload)
                .await?;
            state.relay.playback(&room_code, action, payload).await;
        }

        ClientEvent::ChatMessage { room_code, message } => {
            state.relay.chat(&room_code, session_id, message).await;
        }

        ClientEvent::WebrtcOffer { room_code, payload, target_user_id } => {
            state
                .relay
                .signal(&room_code, SignalKind::Offer, session_id, payload, target_user_id)
                .await;
        }

        ClientEvent::WebrtcAnswer { room_code, payload, target_user_id } => {
            state
                .relay
                .signal(&room_code, SignalKind::Answer, session_id, payload, target_user_id)
                .await;
        }

        ClientEvent::WebrtcIceCandidate { room_code, payload, target_user_id } => {
            state
                .relay
                .signal(&room_code, SignalKind::IceCandidate, session_id, payload, target_user_id)
                .await;
        }

        ClientEvent::EndRoom { room_code, user_id } => {
            let outcome = state.lifecycle.end_room(&room_code, &user_id).await?;
            tracing::debug!(%session_id, %room_code, ?outcome, "end-room handled");
        }
    }

    Ok(())
}
