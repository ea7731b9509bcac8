//! The lobby record.

use std::net::SocketAddr;

use openlobby_protocol::{HostRequest, LobbyId};
use openlobby_transport::ConnectionId;

/// A connection that joined a lobby.
///
/// The store holds only the handle; the connection itself belongs to the
/// server loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// The joined connection.
    pub connection: ConnectionId,
    /// Its remote address at the time it joined.
    pub addr: SocketAddr,
}

/// A hosted lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    /// Unique ID, assigned by the store.
    pub id: LobbyId,
    /// Where joiners should connect: the hosting connection's remote
    /// address, never anything taken from the request body.
    pub host: SocketAddr,
    /// Display name.
    pub name: String,
    /// Password a joiner must present.
    pub password: String,
    /// Whether the host asked for the lobby to be publicly listed.
    pub public: bool,
    /// Client limit requested by the host. Informational only.
    pub max_clients: u8,
    /// Joined connections, in join order.
    pub members: Vec<Member>,
}

impl Lobby {
    /// Builds a lobby from a validated host request.
    pub(crate) fn from_request(
        id: LobbyId,
        host: SocketAddr,
        request: HostRequest,
    ) -> Self {
        Self {
            id,
            host,
            name: request.name,
            password: request.password,
            public: request.public,
            max_clients: request.max_clients,
            members: Vec::new(),
        }
    }

    /// `true` if `password` opens this lobby.
    pub fn password_matches(&self, password: &str) -> bool {
        self.password == password
    }

    /// `true` if `connection` has joined.
    pub fn has_member(&self, connection: ConnectionId) -> bool {
        self.members.iter().any(|m| m.connection == connection)
    }
}
