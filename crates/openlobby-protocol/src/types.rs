//! Identity types, the transmission registration table, reply codes, and
//! the bit layout of the host flag byte.

use std::fmt;
use std::str::FromStr;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a lobby.
///
/// Generated server-side from random 64-bit draws. On the wire it travels
/// as a decimal string, which is also what `Display` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LobbyId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(LobbyId)
    }
}

// ---------------------------------------------------------------------------
// TransmissionKind: the registration table
// ---------------------------------------------------------------------------

/// Every kind of transmission the server understands.
///
/// The discriminants are the wire tags. They are a contract with every
/// client ever built: append new kinds, never renumber existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TransmissionKind {
    /// Request to host a lobby.
    Host = 0,
    /// Lobby search (client) or lobby listing (server).
    Query = 1,
    /// Join request (client) or join target (server).
    Join = 2,
    /// A single reply code.
    Reply = 3,
}

/// Tag → kind registration, in tag order.
pub const TRANSMISSION_TABLE: [(u16, TransmissionKind); 4] = [
    (0, TransmissionKind::Host),
    (1, TransmissionKind::Query),
    (2, TransmissionKind::Join),
    (3, TransmissionKind::Reply),
];

impl TransmissionKind {
    /// The wire tag for this kind.
    pub const fn tag(self) -> u16 {
        self as u16
    }

    /// Looks up the kind registered for `tag`.
    pub fn from_tag(tag: u16) -> Result<Self, ProtocolError> {
        TRANSMISSION_TABLE
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, kind)| *kind)
            .ok_or(ProtocolError::UnknownTag(tag))
    }
}

impl fmt::Display for TransmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "Host"),
            Self::Query => write!(f, "Query"),
            Self::Join => write!(f, "Join"),
            Self::Reply => write!(f, "Reply"),
        }
    }
}

// ---------------------------------------------------------------------------
// ReplyCode
// ---------------------------------------------------------------------------

/// The outcome carried by a Reply transmission.
///
/// Same rule as the tags: values are wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReplyCode {
    /// The lobby was created.
    HostingSuccess = 0,
    /// The host request was rejected.
    HostingError = 1,
    /// Join password did not match.
    WrongPassword = 2,
    /// Either side is closing the connection.
    DisconnectInit = 3,
    /// A query or join body could not be decoded.
    MalformedRequest = 4,
    /// The server failed while handling an otherwise valid request.
    ServerError = 5,
}

impl ReplyCode {
    /// Every reply code, in value order.
    pub const ALL: [ReplyCode; 6] = [
        Self::HostingSuccess,
        Self::HostingError,
        Self::WrongPassword,
        Self::DisconnectInit,
        Self::MalformedRequest,
        Self::ServerError,
    ];

    /// The wire byte for this code.
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ReplyCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(ProtocolError::UnknownReplyCode(value))
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// Host flag byte
// ---------------------------------------------------------------------------

/// Bit 7 of the host flag byte: the lobby is publicly visible.
pub const PUBLIC_MASK: u8 = 0b1000_0000;

/// Bits 0..=6 of the host flag byte: the max-client count.
pub const MAX_CLIENTS_MASK: u8 = 0b0111_1111;

/// Smallest legal max-client count.
pub const MIN_MAX_CLIENTS: u8 = 2;

/// Largest legal max-client count; 127 (all seven bits set) is reserved.
pub const MAX_MAX_CLIENTS: u8 = MAX_CLIENTS_MASK - 1;

/// Packs the visibility flag and max-client count into one byte.
///
/// Only the low seven bits of `max_clients` are kept.
pub const fn pack_host_flags(public: bool, max_clients: u8) -> u8 {
    let visibility = if public { PUBLIC_MASK } else { 0 };
    visibility | (max_clients & MAX_CLIENTS_MASK)
}

/// Splits a host flag byte into `(public, max_clients)`.
pub const fn unpack_host_flags(byte: u8) -> (bool, u8) {
    (byte & PUBLIC_MASK != 0, byte & MAX_CLIENTS_MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_stable() {
        assert_eq!(TransmissionKind::Host.tag(), 0);
        assert_eq!(TransmissionKind::Query.tag(), 1);
        assert_eq!(TransmissionKind::Join.tag(), 2);
        assert_eq!(TransmissionKind::Reply.tag(), 3);
    }

    #[test]
    fn test_table_agrees_with_discriminants() {
        for (tag, kind) in TRANSMISSION_TABLE {
            assert_eq!(kind.tag(), tag);
            assert_eq!(TransmissionKind::from_tag(tag).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            TransmissionKind::from_tag(4),
            Err(ProtocolError::UnknownTag(4))
        );
        assert!(TransmissionKind::from_tag(u16::MAX).is_err());
    }

    #[test]
    fn test_reply_code_bytes() {
        for code in ReplyCode::ALL {
            assert_eq!(ReplyCode::try_from(code.as_byte()).unwrap(), code);
        }
        assert_eq!(ReplyCode::DisconnectInit.as_byte(), 3);
        assert_eq!(
            ReplyCode::try_from(6),
            Err(ProtocolError::UnknownReplyCode(6))
        );
    }

    #[test]
    fn test_lobby_id_text_form() {
        assert_eq!(LobbyId(42).to_string(), "42");
        assert_eq!("18446744073709551615".parse::<LobbyId>().unwrap(), LobbyId(u64::MAX));
        assert!("abc".parse::<LobbyId>().is_err());
        assert!("-1".parse::<LobbyId>().is_err());
    }

    #[test]
    fn test_unpack_every_flag_byte() {
        for byte in 0..=u8::MAX {
            let (public, max_clients) = unpack_host_flags(byte);
            assert_eq!(public, byte >= 128, "byte {byte}");
            assert_eq!(max_clients, byte % 128, "byte {byte}");
            assert_eq!(pack_host_flags(public, max_clients), byte);
        }
    }

    #[test]
    fn test_pack_keeps_visibility_out_of_count() {
        assert_eq!(pack_host_flags(true, 2), 0x82);
        assert_eq!(pack_host_flags(false, 126), 0x7E);
        // A count that spills into bit 7 does not flip visibility.
        assert_eq!(pack_host_flags(false, 0xFF), 0x7F);
    }
}
