//! The message catalogue: typed bodies for every transmission kind.
//!
//! Query and Join carry a different body depending on direction, so each
//! direction gets its own type under the same kind:
//!
//! | Kind  | Client → server   | Server → client  |
//! |-------|-------------------|------------------|
//! | Host  | [`HostRequest`]   | –                |
//! | Query | [`LobbySearch`]   | [`LobbyListing`] |
//! | Join  | [`JoinRequest`]   | [`JoinTarget`]   |
//! | Reply | [`Reply`]         | [`Reply`]        |

use std::net::SocketAddr;
use std::ops::RangeInclusive;

use crate::wire::{
    decode_byte_string, decode_string_array, encode_byte_string,
    encode_string_array, expect_consumed, MAX_ARRAY_LEN,
};
use crate::{
    pack_host_flags, unpack_host_flags, FieldError, LobbyId, ProtocolError,
    ReplyCode, Transmission, TransmissionKind, MAX_MAX_CLIENTS,
    MIN_MAX_CLIENTS,
};

/// Allowed lobby name lengths, in ASCII characters.
pub const NAME_LEN: RangeInclusive<usize> = 5..=16;

/// Allowed lobby password lengths, in ASCII characters.
pub const PASSWORD_LEN: RangeInclusive<usize> = 5..=16;

/// Allowed max-client counts.
pub const MAX_CLIENTS: RangeInclusive<u8> = MIN_MAX_CLIENTS..=MAX_MAX_CLIENTS;

/// Most lobbies one listing can carry: two array elements per lobby.
pub const MAX_LISTING_LEN: usize = MAX_ARRAY_LEN / 2;

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Client → server: "host a lobby with these settings."
///
/// ```text
/// [public:1 | max_clients:7][name byte-string][password byte-string]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    /// Whether the lobby should be publicly visible.
    pub public: bool,
    /// Maximum number of clients, 2..=126.
    pub max_clients: u8,
    /// Lobby name, 5..=16 ASCII characters.
    pub name: String,
    /// Lobby password, 5..=16 ASCII characters.
    pub password: String,
}

impl HostRequest {
    /// Builds a validated request.
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        max_clients: u8,
        public: bool,
    ) -> Result<Self, ProtocolError> {
        let request = Self {
            public,
            max_clients,
            name: name.into(),
            password: password.into(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Checks every field against its bounds.
    pub fn validate(&self) -> Result<(), FieldError> {
        if !NAME_LEN.contains(&self.name.len()) {
            return Err(FieldError::NameLength(self.name.len()));
        }
        if !PASSWORD_LEN.contains(&self.password.len()) {
            return Err(FieldError::PasswordLength(self.password.len()));
        }
        if !MAX_CLIENTS.contains(&self.max_clients) {
            return Err(FieldError::MaxClients(self.max_clients));
        }
        Ok(())
    }
}

impl Transmission for HostRequest {
    const KIND: TransmissionKind = TransmissionKind::Host;

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        self.validate()?;
        out.push(pack_host_flags(self.public, self.max_clients));
        encode_byte_string(&self.name, out)?;
        encode_byte_string(&self.password, out)?;
        Ok(())
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtocolError> {
        let flags = *body.first().ok_or(ProtocolError::Truncated {
            needed: 1,
            available: 0,
        })?;
        let (public, max_clients) = unpack_host_flags(flags);

        let mut offset = 1;
        let (name, len) = decode_byte_string(body, offset)?;
        offset += len;
        let (password, len) = decode_byte_string(body, offset)?;
        offset += len;
        expect_consumed(body, offset)?;

        let request = Self {
            public,
            max_clients,
            name,
            password,
        };
        request.validate()?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Client → server: "show me the open lobbies."
///
/// The filter is carried on the wire but the server currently answers with
/// every lobby regardless.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LobbySearch {
    /// Free-text search filter.
    pub filter: String,
}

impl LobbySearch {
    /// Creates a search for `filter`.
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
        }
    }
}

impl Transmission for LobbySearch {
    const KIND: TransmissionKind = TransmissionKind::Query;

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        encode_byte_string(&self.filter, out)?;
        Ok(())
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtocolError> {
        let (filter, len) = decode_byte_string(body, 0)?;
        expect_consumed(body, len)?;
        Ok(Self { filter })
    }
}

/// One row of a lobby listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbySummary {
    /// The lobby's ID.
    pub id: LobbyId,
    /// The lobby's name.
    pub name: String,
}

/// Server → client: the open lobbies, as a flattened string array of
/// `id, name` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LobbyListing {
    /// Listed lobbies. Order carries no meaning.
    pub lobbies: Vec<LobbySummary>,
}

impl Transmission for LobbyListing {
    const KIND: TransmissionKind = TransmissionKind::Query;

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        if self.lobbies.len() > MAX_LISTING_LEN {
            return Err(ProtocolError::ArrayTooLong(self.lobbies.len() * 2));
        }
        let flat: Vec<String> = self
            .lobbies
            .iter()
            .flat_map(|l| [l.id.to_string(), l.name.clone()])
            .collect();
        encode_string_array(&flat, out)?;
        Ok(())
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtocolError> {
        let (flat, len) = decode_string_array(body, 0)?;
        expect_consumed(body, len)?;
        if flat.len() % 2 != 0 {
            return Err(ProtocolError::MalformedBody(format!(
                "listing has {} elements, expected id/name pairs",
                flat.len()
            )));
        }

        let lobbies = flat
            .chunks_exact(2)
            .map(|pair| {
                let id = pair[0].parse().map_err(|_| {
                    ProtocolError::MalformedBody(format!(
                        "lobby id {:?} is not a number",
                        pair[0]
                    ))
                })?;
                Ok(LobbySummary {
                    id,
                    name: pair[1].clone(),
                })
            })
            .collect::<Result<_, ProtocolError>>()?;
        Ok(Self { lobbies })
    }
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// Client → server: "let me into this lobby."
///
/// The ID stays as sent. Whether it parses is the server's call, not the
/// codec's: an unparseable ID is a valid frame that names no lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// The lobby ID as a decimal string.
    pub lobby_id: String,
    /// The lobby password.
    pub password: String,
}

impl JoinRequest {
    /// Creates a request for lobby `id`.
    pub fn new(id: LobbyId, password: impl Into<String>) -> Self {
        Self {
            lobby_id: id.to_string(),
            password: password.into(),
        }
    }

    /// The requested lobby ID, if it is a valid decimal `u64`.
    pub fn parsed_lobby_id(&self) -> Option<LobbyId> {
        self.lobby_id.parse().ok()
    }
}

impl Transmission for JoinRequest {
    const KIND: TransmissionKind = TransmissionKind::Join;

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        encode_byte_string(&self.lobby_id, out)?;
        encode_byte_string(&self.password, out)?;
        Ok(())
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtocolError> {
        let (lobby_id, first) = decode_byte_string(body, 0)?;
        let (password, second) = decode_byte_string(body, first)?;
        expect_consumed(body, first + second)?;
        Ok(Self { lobby_id, password })
    }
}

/// Server → client: "the host is here, connect to it directly."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTarget {
    /// The host endpoint as `ip:port`.
    pub address: String,
}

impl JoinTarget {
    /// Creates a target pointing at `host`.
    pub fn new(host: SocketAddr) -> Self {
        Self {
            address: host.to_string(),
        }
    }

    /// The host endpoint, if the address parses.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.address.parse().ok()
    }
}

impl Transmission for JoinTarget {
    const KIND: TransmissionKind = TransmissionKind::Join;

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        encode_byte_string(&self.address, out)?;
        Ok(())
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtocolError> {
        let (address, len) = decode_byte_string(body, 0)?;
        expect_consumed(body, len)?;
        Ok(Self { address })
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Either direction: a single reply code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// The outcome.
    pub code: ReplyCode,
}

impl Reply {
    /// Creates a reply carrying `code`.
    pub fn new(code: ReplyCode) -> Self {
        Self { code }
    }
}

impl Transmission for Reply {
    const KIND: TransmissionKind = TransmissionKind::Reply;

    fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        out.push(self.code.as_byte());
        Ok(())
    }

    fn decode_body(body: &[u8]) -> Result<Self, ProtocolError> {
        let byte = *body.first().ok_or(ProtocolError::Truncated {
            needed: 1,
            available: 0,
        })?;
        expect_consumed(body, 1)?;
        Ok(Self {
            code: ReplyCode::try_from(byte)?,
        })
    }
}
