//! Error types for the protocol layer.
//!
//! Each crate in OpenLobby defines its own error enum. A `ProtocolError`
//! always means the bytes themselves were wrong: either the frame could not
//! be taken apart at all, or it could and one of its fields broke a rule.

use crate::TransmissionKind;

/// A decoded field that is outside its contractual bounds.
///
/// These pass structural decoding (the lengths add up) but violate the
/// rules a lobby request must follow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// Lobby names must be 5 to 16 ASCII characters.
    #[error("lobby name length {0} is out of range")]
    NameLength(usize),

    /// Lobby passwords must be 5 to 16 ASCII characters.
    #[error("lobby password length {0} is out of range")]
    PasswordLength(usize),

    /// Max clients must be 2 to 126; 0, 1 and the 127 sentinel are rejected.
    #[error("max clients {0} is out of range")]
    MaxClients(u8),
}

/// Errors that can occur while encoding or decoding frames.
///
/// `#[derive(thiserror::Error)]` generates the `std::error::Error` impl;
/// each `#[error("...")]` is what shows up in logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ends before the length a header declared.
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// A frame body would exceed the 2-byte length budget.
    #[error("frame body of {0} bytes exceeds the maximum of 65531")]
    FrameTooLarge(usize),

    /// A byte-string payload would exceed the 1-byte length budget.
    #[error("string of {0} bytes exceeds the maximum of 254")]
    StringTooLong(usize),

    /// A string array would exceed the 1-byte count budget.
    #[error("string array of {0} elements exceeds the maximum of 255")]
    ArrayTooLong(usize),

    /// A byte-string header of 0 (it must at least count itself).
    #[error("byte-string header declares zero length")]
    ZeroLengthHeader,

    /// A string array's lengths table disagrees with an element's own header.
    #[error("string array element {index} declares {declared} bytes, table says {expected}")]
    ArrayLengthMismatch {
        index: usize,
        declared: usize,
        expected: usize,
    },

    /// Strings on the wire are ASCII only.
    #[error("non-ASCII byte in string")]
    NonAscii,

    /// Bytes left over after the last field of a body.
    #[error("{0} trailing bytes after body")]
    TrailingBytes(usize),

    /// The frame header carries a tag no transmission kind is registered for.
    #[error("unknown transmission tag {0}")]
    UnknownTag(u16),

    /// A reply frame carries a code outside the reply-code table.
    #[error("unknown reply code {0}")]
    UnknownReplyCode(u8),

    /// A frame was handed to the parser of a different transmission kind.
    #[error("expected a {expected} frame, got tag {found}")]
    WrongKind {
        expected: TransmissionKind,
        found: u16,
    },

    /// A body whose shape is wrong for its kind (e.g. an odd listing).
    #[error("malformed body: {0}")]
    MalformedBody(String),

    /// The frame decoded, but a field is out of bounds.
    #[error("invalid field: {0}")]
    InvalidField(#[from] FieldError),
}

impl ProtocolError {
    /// `true` when the bytes could not be taken apart (wrong lengths,
    /// unknown tag, bad encoding).
    pub fn is_malformed(&self) -> bool {
        !self.is_invalid_field()
    }

    /// `true` when the frame decoded but a field broke a semantic rule.
    pub fn is_invalid_field(&self) -> bool {
        matches!(self, Self::InvalidField(_))
    }
}
