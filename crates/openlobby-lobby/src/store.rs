//! The lobby store: every open lobby, keyed by ID.

use std::collections::HashMap;
use std::net::SocketAddr;

use openlobby_protocol::{HostRequest, LobbyId, LobbySummary};
use openlobby_transport::ConnectionId;

use crate::{IdSource, Lobby, LobbyError, Member, RandomIds};

/// How many candidate IDs [`LobbyStore::create`] draws before giving up.
///
/// With 64-bit random IDs a single collision is already unlikely; the
/// bound only matters for tiny test ID spaces.
pub const MAX_ID_ATTEMPTS: usize = 1024;

/// Owns every open lobby.
///
/// Lobbies are never removed. Members are removed when their connection
/// closes ([`LobbyStore::forget_connection`]).
pub struct LobbyStore<I: IdSource = RandomIds> {
    lobbies: HashMap<LobbyId, Lobby>,
    ids: I,
}

impl LobbyStore {
    /// Creates an empty store with random IDs.
    pub fn new() -> Self {
        Self::with_id_source(RandomIds)
    }
}

impl Default for LobbyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: IdSource> LobbyStore<I> {
    /// Creates an empty store that draws IDs from `ids`.
    pub fn with_id_source(ids: I) -> Self {
        Self {
            lobbies: HashMap::new(),
            ids,
        }
    }

    /// Stores a new lobby for `request`, hosted at `host`, and returns
    /// its ID.
    ///
    /// Draws IDs until one is free, at most [`MAX_ID_ATTEMPTS`] times.
    pub fn create(
        &mut self,
        host: SocketAddr,
        request: HostRequest,
    ) -> Result<LobbyId, LobbyError> {
        let id = self.fresh_id()?;
        let lobby = Lobby::from_request(id, host, request);
        tracing::info!(lobby_id = %id, name = %lobby.name, %host, "lobby created");
        self.lobbies.insert(id, lobby);
        Ok(id)
    }

    fn fresh_id(&mut self) -> Result<LobbyId, LobbyError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = LobbyId(self.ids.next_id());
            if !self.lobbies.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(LobbyError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Looks up a lobby.
    pub fn get(&self, id: LobbyId) -> Option<&Lobby> {
        self.lobbies.get(&id)
    }

    /// Every lobby as `(id, name)`, in store iteration order.
    pub fn list_all(&self) -> Vec<LobbySummary> {
        self.lobbies
            .values()
            .map(|lobby| LobbySummary {
                id: lobby.id,
                name: lobby.name.clone(),
            })
            .collect()
    }

    /// Adds `member` to lobby `id`.
    ///
    /// Returns `Ok(false)` if that connection had already joined; the
    /// member list is left as it was.
    pub fn add_member(
        &mut self,
        id: LobbyId,
        member: Member,
    ) -> Result<bool, LobbyError> {
        let lobby = self.lobbies.get_mut(&id).ok_or(LobbyError::NotFound(id))?;
        if lobby.has_member(member.connection) {
            return Ok(false);
        }
        lobby.members.push(member);
        tracing::info!(
            lobby_id = %id,
            conn_id = %member.connection,
            addr = %member.addr,
            "member joined"
        );
        Ok(true)
    }

    /// Drops `connection` from every member list it appears in.
    pub fn forget_connection(&mut self, connection: ConnectionId) {
        for lobby in self.lobbies.values_mut() {
            lobby.members.retain(|m| m.connection != connection);
        }
    }

    /// Number of open lobbies.
    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    /// `true` if no lobby is open.
    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<u64>);

    impl IdSource for Fixed {
        fn next_id(&mut self) -> u64 {
            if self.0.len() > 1 {
                self.0.remove(0)
            } else {
                self.0[0]
            }
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([10, 0, 0, 1], port))
    }

    fn request(name: &str) -> HostRequest {
        HostRequest::new(name, "secret1", 8, true).unwrap()
    }

    fn member(id: u64) -> Member {
        Member {
            connection: ConnectionId::new(id),
            addr: addr(9000 + id as u16),
        }
    }

    // =========================================================================
    // create / get
    // =========================================================================

    #[test]
    fn test_create_stores_request_fields_and_host() {
        let mut store = LobbyStore::with_id_source(Fixed(vec![7]));
        let id = store.create(addr(4000), request("Alpha")).unwrap();

        assert_eq!(id, LobbyId(7));
        let lobby = store.get(id).unwrap();
        assert_eq!(lobby.host, addr(4000));
        assert_eq!(lobby.name, "Alpha");
        assert_eq!(lobby.password, "secret1");
        assert_eq!(lobby.max_clients, 8);
        assert!(lobby.public);
        assert!(lobby.members.is_empty());
    }

    #[test]
    fn test_create_skips_taken_ids() {
        let mut store = LobbyStore::with_id_source(Fixed(vec![1, 1, 1, 2]));
        let first = store.create(addr(1), request("Alpha")).unwrap();
        let second = store.create(addr(2), request("Bravo")).unwrap();
        assert_eq!(first, LobbyId(1));
        assert_eq!(second, LobbyId(2));
    }

    #[test]
    fn test_create_gives_up_when_every_id_collides() {
        let mut store = LobbyStore::with_id_source(Fixed(vec![5]));
        store.create(addr(1), request("Alpha")).unwrap();
        assert_eq!(
            store.create(addr(2), request("Bravo")),
            Err(LobbyError::IdSpaceExhausted {
                attempts: MAX_ID_ATTEMPTS
            })
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown_is_none() {
        let store = LobbyStore::new();
        assert!(store.get(LobbyId(1)).is_none());
        assert!(store.is_empty());
    }

    // =========================================================================
    // membership
    // =========================================================================

    #[test]
    fn test_add_member_appends_in_order() {
        let mut store = LobbyStore::new();
        let id = store.create(addr(1), request("Alpha")).unwrap();

        assert!(store.add_member(id, member(1)).unwrap());
        assert!(store.add_member(id, member(2)).unwrap());
        assert_eq!(store.get(id).unwrap().members, [member(1), member(2)]);
    }

    #[test]
    fn test_add_member_twice_is_a_no_op() {
        let mut store = LobbyStore::new();
        let id = store.create(addr(1), request("Alpha")).unwrap();

        assert!(store.add_member(id, member(1)).unwrap());
        assert!(!store.add_member(id, member(1)).unwrap());
        assert_eq!(store.get(id).unwrap().members.len(), 1);
    }

    #[test]
    fn test_add_member_to_unknown_lobby() {
        let mut store = LobbyStore::new();
        assert_eq!(
            store.add_member(LobbyId(3), member(1)),
            Err(LobbyError::NotFound(LobbyId(3)))
        );
    }

    #[test]
    fn test_forget_connection_prunes_every_lobby() {
        let mut store = LobbyStore::with_id_source(Fixed(vec![1, 2]));
        let a = store.create(addr(1), request("Alpha")).unwrap();
        let b = store.create(addr(2), request("Bravo")).unwrap();
        store.add_member(a, member(1)).unwrap();
        store.add_member(a, member(2)).unwrap();
        store.add_member(b, member(1)).unwrap();

        store.forget_connection(ConnectionId::new(1));

        assert_eq!(store.get(a).unwrap().members, [member(2)]);
        assert!(store.get(b).unwrap().members.is_empty());
        // Lobbies outlive their members.
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_password_matches_is_exact() {
        let mut store = LobbyStore::new();
        let id = store.create(addr(1), request("Alpha")).unwrap();
        let lobby = store.get(id).unwrap();
        assert!(lobby.password_matches("secret1"));
        assert!(!lobby.password_matches("Secret1"));
        assert!(!lobby.password_matches("secret"));
    }
}
