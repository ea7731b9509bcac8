//! # OpenLobby
//!
//! A lobby and matchmaking server. Clients connect over TCP, host lobbies,
//! list them, and join one by ID and password. The server answers a
//! successful join with the host's address; the players then talk to each
//! other directly.
//!
//! ## Layers
//!
//! ```text
//! accept loop ──pending queue──→ ServerLoop::tick
//!                                  ├─ poll: TcpConnection → Frame
//!                                  ├─ dispatch: Frame → handler → LobbyStore
//!                                  └─ reply: message → Frame → TcpConnection
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use openlobby::prelude::*;
//!
//! # async fn start() -> Result<(), ServerError> {
//! let server = LobbyServer::builder()
//!     .config(ServerConfig::new(7777))
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
mod config;
mod error;
mod handler;
mod server;
mod server_loop;
mod shutdown;

pub use client::{JoinOutcome, LobbyClient};
pub use config::{
    ConfigError, ConfigOverrides, FileConfig, ServerConfig, ENV_BIND_HOST,
    ENV_LISTEN_PORT, ENV_TICK_RATE_HZ,
};
pub use error::ServerError;
pub use handler::error_reply;
pub use server::{LobbyServer, LobbyServerBuilder};
pub use server_loop::{ServerLoop, TickReport};
pub use shutdown::ShutdownSignal;

/// Re-exports for typical use.
pub mod prelude {
    pub use crate::{
        ConfigOverrides, JoinOutcome, LobbyClient, LobbyServer,
        LobbyServerBuilder, ServerConfig, ServerError, ServerLoop,
        ShutdownSignal,
    };
    pub use openlobby_lobby::{Lobby, LobbyStore, Member};
    pub use openlobby_protocol::{
        HostRequest, JoinRequest, JoinTarget, LobbyId, LobbyListing,
        LobbySearch, LobbySummary, Reply, ReplyCode, Transmission,
        TransmissionKind,
    };
    pub use openlobby_transport::{Connection, ConnectionId};
}
