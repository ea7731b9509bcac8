//! Wire protocol for OpenLobby.
//!
//! This crate defines the bytes that clients and the lobby server exchange:
//!
//! - **Wire codec** ([`wire`]): big-endian `u16`s, length-prefixed
//!   ASCII byte-strings, and string arrays, as pure buffer functions.
//! - **Frames** ([`Frame`], [`FrameHeader`]): `[tag][len][body]`.
//! - **Message catalogue** ([`HostRequest`], [`LobbySearch`],
//!   [`LobbyListing`], [`JoinRequest`], [`JoinTarget`], [`Reply`]): typed
//!   bodies behind the [`Transmission`] trait.
//! - **Errors** ([`ProtocolError`], [`FieldError`]).
//!
//! # Architecture
//!
//! The protocol layer does no I/O. It sits between the transport (which
//! reassembles frames from a stream) and the server loop (which acts on
//! typed messages).
//!
//! ```text
//! Transport (bytes → Frame) → Protocol (Frame → message) → Server loop
//! ```

mod codec;
mod error;
mod frame;
mod messages;
mod types;
pub mod wire;

pub use codec::Transmission;
pub use error::{FieldError, ProtocolError};
pub use frame::{Frame, FrameHeader, HEADER_SIZE, MAX_BODY_LEN, MAX_FRAME_SIZE};
pub use messages::{
    HostRequest, JoinRequest, JoinTarget, LobbyListing, LobbySearch,
    LobbySummary, Reply, MAX_CLIENTS, MAX_LISTING_LEN, NAME_LEN,
    PASSWORD_LEN,
};
pub use types::{
    pack_host_flags, unpack_host_flags, LobbyId, ReplyCode, TransmissionKind,
    MAX_CLIENTS_MASK, MAX_MAX_CLIENTS, MIN_MAX_CLIENTS, PUBLIC_MASK,
    TRANSMISSION_TABLE,
};
