//! Unified error type for the Tombola server.

use tombola_protocol::ProtocolError;
use tombola_session::GameError;
use tombola_transport::TransportError;

/// Top-level error that wraps all layer-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid handshake).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level rejection that ended the connection.
    #[error(transparent)]
    Game(#[from] GameError),
}
