//! Error types for the lobby store.

use openlobby_protocol::LobbyId;

/// Errors that can occur during lobby store operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LobbyError {
    /// No lobby has this ID.
    #[error("lobby {0} not found")]
    NotFound(LobbyId),

    /// Every drawn ID collided with an existing lobby.
    #[error("no free lobby id after {attempts} attempts")]
    IdSpaceExhausted {
        /// How many IDs were drawn.
        attempts: usize,
    },
}
