//! Integration tests for the lobby store's ID allocation and listing.

use std::collections::HashSet;
use std::net::SocketAddr;

use openlobby_lobby::{IdSource, LobbyError, LobbyStore, MAX_ID_ATTEMPTS};
use openlobby_protocol::{HostRequest, LobbyId};

/// Cycles through `0..modulus`, so only `modulus` distinct IDs exist.
struct CyclingIds {
    next: u64,
    modulus: u64,
}

impl IdSource for CyclingIds {
    fn next_id(&mut self) -> u64 {
        let id = self.next % self.modulus;
        self.next += 1;
        id
    }
}

fn host() -> SocketAddr {
    "127.0.0.1:7777".parse().unwrap()
}

fn request(i: usize) -> HostRequest {
    HostRequest::new(format!("lobby{i:03}"), "password", 4, false).unwrap()
}

#[test]
fn test_random_ids_are_distinct() {
    let mut store = LobbyStore::new();
    let ids: HashSet<LobbyId> = (0..1000)
        .map(|i| store.create(host(), request(i)).unwrap())
        .collect();
    assert_eq!(ids.len(), 1000);
    assert_eq!(store.len(), 1000);
}

#[test]
fn test_small_id_space_fills_then_terminates() {
    let mut store = LobbyStore::with_id_source(CyclingIds {
        next: 0,
        modulus: 8,
    });

    let ids: HashSet<LobbyId> = (0..8)
        .map(|i| store.create(host(), request(i)).unwrap())
        .collect();
    assert_eq!(ids.len(), 8);

    let err = store.create(host(), request(8)).unwrap_err();
    assert_eq!(
        err,
        LobbyError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS
        }
    );
}

#[test]
fn test_list_all_returns_every_lobby_once() {
    let mut store = LobbyStore::new();
    let alpha = store
        .create(host(), HostRequest::new("Alpha", "pass1", 2, true).unwrap())
        .unwrap();
    let beta = store
        .create(host(), HostRequest::new("Beta!", "pass2", 2, false).unwrap())
        .unwrap();

    let mut listed: Vec<(LobbyId, String)> = store
        .list_all()
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    listed.sort();

    let mut expected = vec![(alpha, "Alpha".to_string()), (beta, "Beta!".to_string())];
    expected.sort();
    assert_eq!(listed, expected);
}
