//! `TombolaServer` builder and accept loop.
//!
//! The entry point for running the game server. Ties the layers
//! together: transport → protocol → session coordinator.

use std::sync::Arc;

use tombola_protocol::{Codec, JsonCodec};
use tombola_session::{
    AuditSink, CoordinatorHandle, GameConfig, LogAuditSink,
    spawn_coordinator,
};
use tombola_transport::{Transport, WebSocketTransport};

use crate::ServerError;
use crate::handler::handle_connection;

/// The current protocol version. Clients must send it in their `Hello`
/// or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: CoordinatorHandle,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Tombola server.
pub struct TombolaServerBuilder {
    bind_addr: String,
    config: GameConfig,
    audit: Arc<dyn AuditSink>,
}

impl TombolaServerBuilder {
    /// Creates a new builder with default settings: localhost bind, the
    /// classic 32-card setup, and audit records going to the log.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: GameConfig::default(),
            audit: Arc::new(LogAuditSink),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the card universe and board-pool dimensions.
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the audit sink for join/win records.
    pub fn audit(mut self, sink: impl AuditSink) -> Self {
        self.audit = Arc::new(sink);
        self
    }

    /// Binds the listener, spawns the session coordinator, and returns
    /// the ready-to-run server. Uses `JsonCodec` on the wire.
    pub async fn build(self) -> Result<TombolaServer<JsonCodec>, ServerError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let coordinator = spawn_coordinator(self.config, self.audit);

        Ok(TombolaServer {
            transport,
            state: Arc::new(ServerState {
                coordinator,
                codec: JsonCodec,
            }),
        })
    }
}

impl Default for TombolaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Tombola game server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TombolaServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> TombolaServer<C> {
    /// Creates a new builder.
    pub fn builder() -> TombolaServerBuilder {
        TombolaServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the session coordinator, e.g. for health probes.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.state.coordinator.clone()
    }

    /// Runs the accept loop: each connection gets its own handler task.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("tombola server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, state).await
                        {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
