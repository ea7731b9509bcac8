//! Lobby registry for OpenLobby.
//!
//! Lobbies live in memory for the lifetime of the process. The store is
//! owned by the server loop and mutated only from inside a tick, so it
//! needs no locking.
//!
//! # Key types
//!
//! - [`LobbyStore`]: create, look up, enumerate, and join lobbies
//! - [`Lobby`]: one hosted lobby and its joined members
//! - [`IdSource`]: where fresh lobby IDs come from ([`RandomIds`] by default)

mod error;
mod ids;
mod lobby;
mod store;

pub use error::LobbyError;
pub use ids::{IdSource, RandomIds};
pub use lobby::{Lobby, Member};
pub use store::{LobbyStore, MAX_ID_ATTEMPTS};
