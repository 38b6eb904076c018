//! `SyncServer` builder and accept loop.
//!
//! This is the entry point for running a syncroom relay. It ties together
//! all the layers: transport → protocol → session → room → store.

use std::future::Future;
use std::sync::Arc;

use syncroom_protocol::{Codec, JsonCodec};
use syncroom_room::{LifecycleManager, RelayDispatcher, RoomCoordinator};
use syncroom_store::RoomStore;
use syncroom_transport::{Handshake, Transport, WebSocketTransport};

use crate::SyncroomError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The registry
/// behind `relay` is the only mutable shared state besides the store.
pub(crate) struct ServerState<S: RoomStore, C: Codec> {
    pub(crate) relay: RelayDispatcher,
    pub(crate) coordinator: Arc<RoomCoordinator<S>>,
    pub(crate) lifecycle: LifecycleManager<S>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a syncroom server.
///
/// # Example
///
/// ```rust,ignore
/// use syncroom::prelude::*;
///
/// let store = Arc::new(MongoRoomStore::new(MongoConfig::new(uri)));
/// let server = SyncServerBuilder::new()
///     .bind("0.0.0.0:3001")
///     .allowed_origins(vec!["https://mv-live.vercel.app".into()])
///     .build(store)
///     .await?;
/// server.run().await
/// ```
pub struct SyncServerBuilder {
    bind_addr: String,
    allowed_origins: Vec<String>,
}

impl SyncServerBuilder {
    /// Creates a new builder with default settings.
    ///
    /// No origin restriction is applied unless
    /// [`allowed_origins`](Self::allowed_origins) is called.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            allowed_origins: Vec::new(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Restricts WebSocket upgrades to these `Origin` values. An empty list
    /// accepts every origin.
    pub fn allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Binds the listener and wires the room layer to `store`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<S: RoomStore>(
        self,
        store: Arc<S>,
    ) -> Result<SyncServer<S, JsonCodec>, SyncroomError> {
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_allowed_origins(self.allowed_origins);

        let relay = RelayDispatcher::new();
        let coordinator = Arc::new(RoomCoordinator::new(store));
        let lifecycle = LifecycleManager::new(Arc::clone(&coordinator), relay.clone());

        let state = Arc::new(ServerState {
            relay,
            coordinator,
            lifecycle,
            codec: JsonCodec,
        });

        Ok(SyncServer { transport, state })
    }
}

impl Default for SyncServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound syncroom server.
///
/// Call [`run()`](Self::run) or [`run_until()`](Self::run_until) to start
/// accepting connections.
pub struct SyncServer<S: RoomStore, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<S, C>>,
}

impl<S, C> SyncServer<S, C>
where
    S: RoomStore,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle that observes the server after `run` has taken it.
    pub fn monitor(&self) -> ServerMonitor<S, C> {
        ServerMonitor {
            state: Arc::clone(&self.state),
        }
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), SyncroomError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves.
    ///
    /// Each accepted stream gets its own task that runs the WebSocket
    /// upgrade and then the connection handler. Once `shutdown`
    /// fires no new connection is accepted; connections already open are
    /// left to finish with the runtime.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), SyncroomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "syncroom server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(handshake) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            let peer = handshake.peer_addr();
                            match handshake.upgrade().await {
                                Ok(conn) => handle_connection(conn, state).await,
                                Err(e) => tracing::debug!(%peer, error = %e, "upgrade failed"),
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
            }
        }

        Ok(())
    }
}

/// Read-only view of a running server's state.
pub struct ServerMonitor<S: RoomStore, C: Codec> {
    state: Arc<ServerState<S, C>>,
}

impl<S: RoomStore, C: Codec> ServerMonitor<S, C> {
    /// Number of currently connected sessions.
    pub async fn connected_sessions(&self) -> usize {
        self.state.relay.registry().lock().await.len()
    }

    /// Number of rooms with at least one connected member.
    pub async fn occupied_rooms(&self) -> usize {
        self.state.relay.registry().lock().await.room_count()
    }

    /// Number of rooms whose playback state is cached.
    pub async fn cached_rooms(&self) -> usize {
        self.state.coordinator.cached_rooms().await
    }

    /// End requests refused because the requester was not the host.
    pub fn rejected_end_requests(&self) -> u64 {
        self.state.lifecycle.rejected_end_requests()
    }
}
