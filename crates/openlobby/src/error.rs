//! Unified error type for the OpenLobby server.

use openlobby_lobby::LobbyError;
use openlobby_protocol::ProtocolError;
use openlobby_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates `From` impls, so the
/// `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed frame or invalid field).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lobby store error.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// A configuration error at startup.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
