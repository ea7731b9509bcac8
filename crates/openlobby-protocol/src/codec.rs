//! The [`Transmission`] trait: typed bodies that know their own wire layout.
//!
//! Each message kind implements only its body layout. Framing, the tag
//! check, and the size budget live in the provided methods, so every
//! message goes through the same path to and from a [`Frame`].

use crate::{Frame, ProtocolError, TransmissionKind};

/// A typed frame body.
pub trait Transmission: Sized {
    /// The kind (and therefore the tag) this body travels under.
    const KIND: TransmissionKind;

    /// Appends the body bytes to `out`, validating fields first.
    ///
    /// # Errors
    /// A field out of bounds, or a string/array over its length budget.
    fn encode_body(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError>;

    /// Decodes and validates a body. The whole slice must be consumed.
    ///
    /// # Errors
    /// [`ProtocolError::is_malformed`] errors for bad lengths or encoding,
    /// [`ProtocolError::InvalidField`] for out-of-bounds fields.
    fn decode_body(body: &[u8]) -> Result<Self, ProtocolError>;

    /// Encodes this body into a complete frame.
    fn to_frame(&self) -> Result<Frame, ProtocolError> {
        let mut body = Vec::new();
        self.encode_body(&mut body)?;
        Frame::new(Self::KIND.tag(), body)
    }

    /// Parses a received frame as this kind.
    fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        if frame.tag() != Self::KIND.tag() {
            return Err(ProtocolError::WrongKind {
                expected: Self::KIND,
                found: frame.tag(),
            });
        }
        Self::decode_body(frame.body())
    }
}
