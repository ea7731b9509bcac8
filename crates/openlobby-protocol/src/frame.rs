//! The frame: the unit of transmission on the wire.
//!
//! ```text
//! ┌──────────────┬──────────────┬────────────────────────┐
//! │ tag: u16 BE  │ len: u16 BE  │ body: len bytes        │
//! └──────────────┴──────────────┴────────────────────────┘
//!  header (4 bytes)               total <= 65535 bytes
//! ```

use crate::wire::decode_u16_be;
use crate::{ProtocolError, TransmissionKind};

/// Bytes in a frame header: 2 for the tag, 2 for the body length.
pub const HEADER_SIZE: usize = 4;

/// Largest frame, header included.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Largest body a frame can carry.
pub const MAX_BODY_LEN: usize = MAX_FRAME_SIZE - HEADER_SIZE;

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Transmission tag (not yet checked against the registration table).
    pub tag: u16,
    /// Body length in bytes.
    pub body_len: u16,
}

impl FrameHeader {
    /// Decodes a header. Fails if the declared body would push the frame
    /// past [`MAX_FRAME_SIZE`].
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let header = Self::decode_unchecked(bytes)?;
        if header.is_oversized() {
            return Err(ProtocolError::FrameTooLarge(header.body_len()));
        }
        Ok(header)
    }

    /// Reads the two fields as sent, without checking the size bound.
    pub fn decode_unchecked(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self {
            tag: decode_u16_be(bytes, 0)?,
            body_len: decode_u16_be(bytes, 2)?,
        })
    }

    /// `true` if the declared body would push the frame past
    /// [`MAX_FRAME_SIZE`].
    pub fn is_oversized(&self) -> bool {
        self.body_len() > MAX_BODY_LEN
    }

    /// Encodes the header into its 4 wire bytes.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..2].copy_from_slice(&self.tag.to_be_bytes());
        bytes[2..].copy_from_slice(&self.body_len.to_be_bytes());
        bytes
    }

    /// Declared body length as a `usize`.
    pub fn body_len(&self) -> usize {
        self.body_len as usize
    }
}

/// One complete transmission: a tag and exactly `body_len` body bytes.
///
/// A `Frame` can only be built with a body that fits the size budget, so
/// holding one means it can always be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    tag: u16,
    body: Vec<u8>,
}

impl Frame {
    /// Builds a frame, failing if `body` exceeds [`MAX_BODY_LEN`].
    pub fn new(tag: u16, body: Vec<u8>) -> Result<Self, ProtocolError> {
        if body.len() > MAX_BODY_LEN {
            return Err(ProtocolError::FrameTooLarge(body.len()));
        }
        Ok(Self { tag, body })
    }

    /// Joins a received header and body. The body must be exactly as long
    /// as the header says.
    pub fn from_parts(
        header: FrameHeader,
        body: Vec<u8>,
    ) -> Result<Self, ProtocolError> {
        if body.len() != header.body_len() {
            return Err(ProtocolError::Truncated {
                needed: header.body_len(),
                available: body.len(),
            });
        }
        Self::new(header.tag, body)
    }

    /// Decodes a whole frame from a buffer known to be complete.
    ///
    /// The buffer must hold exactly one frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let header_bytes: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|h| h.try_into().ok())
            .ok_or(ProtocolError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            })?;
        let header = FrameHeader::decode(header_bytes)?;
        let end = HEADER_SIZE + header.body_len();
        let body = bytes.get(HEADER_SIZE..end).ok_or(ProtocolError::Truncated {
            needed: end,
            available: bytes.len(),
        })?;
        crate::wire::expect_consumed(bytes, end)?;
        Self::from_parts(header, body.to_vec())
    }

    /// The raw tag.
    pub fn tag(&self) -> u16 {
        self.tag
    }

    /// The registered kind for this frame's tag.
    pub fn kind(&self) -> Result<TransmissionKind, ProtocolError> {
        TransmissionKind::from_tag(self.tag)
    }

    /// The body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The header this frame is sent with.
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            tag: self.tag,
            // Frame::new bounds the body to MAX_BODY_LEN.
            body_len: self.body.len() as u16,
        }
    }

    /// Total encoded size, header included.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Serializes the frame into wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.extend_from_slice(&self.header().encode());
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let frame = Frame::new(0x0102, vec![9, 8, 7]).unwrap();
        assert_eq!(frame.to_bytes(), [0x01, 0x02, 0x00, 0x03, 9, 8, 7]);
        assert_eq!(frame.encoded_len(), 7);
    }

    #[test]
    fn test_frame_decode_whole_buffer() {
        let frame = Frame::new(3, vec![1]).unwrap();
        let decoded = Frame::decode(&frame.to_bytes()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.kind().unwrap(), TransmissionKind::Reply);
    }

    #[test]
    fn test_empty_body_frame() {
        let frame = Frame::new(1, Vec::new()).unwrap();
        assert_eq!(frame.to_bytes(), [0, 1, 0, 0]);
        assert_eq!(Frame::decode(&[0, 1, 0, 0]).unwrap(), frame);
    }

    #[test]
    fn test_body_size_bound() {
        assert!(Frame::new(0, vec![0; MAX_BODY_LEN]).is_ok());
        assert_eq!(
            Frame::new(0, vec![0; MAX_BODY_LEN + 1]),
            Err(ProtocolError::FrameTooLarge(65532))
        );
    }

    #[test]
    fn test_header_rejects_oversized_body_len() {
        let header = FrameHeader::decode(&[0, 0, 0xFF, 0xFB]).unwrap();
        assert_eq!(header.body_len(), MAX_BODY_LEN);
        assert_eq!(
            FrameHeader::decode(&[0, 0, 0xFF, 0xFC]),
            Err(ProtocolError::FrameTooLarge(65532))
        );
    }

    #[test]
    fn test_raw_header_keeps_oversized_length() {
        let header = FrameHeader::decode_unchecked(&[0, 1, 0xFF, 0xFF]).unwrap();
        assert_eq!(header.tag, 1);
        assert_eq!(header.body_len(), 65535);
        assert!(header.is_oversized());
        assert!(!FrameHeader::decode_unchecked(&[0, 1, 0xFF, 0xFB])
            .unwrap()
            .is_oversized());
        assert!(FrameHeader::decode_unchecked(&[0, 1]).is_err());
    }

    #[test]
    fn test_largest_frame_bytes() {
        let frame = Frame::new(2, vec![7; MAX_BODY_LEN]).unwrap();
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), MAX_FRAME_SIZE);
        assert_eq!(&bytes[..HEADER_SIZE], [0, 2, 0xFF, 0xFB]);
        assert_eq!(Frame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_header_round_trip() {
        let header = FrameHeader {
            tag: 2,
            body_len: 300,
        };
        assert_eq!(header.encode(), [0, 2, 0x01, 0x2C]);
        assert_eq!(FrameHeader::decode(&header.encode()).unwrap(), header);
    }

    #[test]
    fn test_decode_short_or_long_buffer() {
        assert!(matches!(
            Frame::decode(&[0, 1, 0, 4, 1, 2]),
            Err(ProtocolError::Truncated { .. })
        ));
        assert_eq!(
            Frame::decode(&[0, 1, 0, 1, 1, 2]),
            Err(ProtocolError::TrailingBytes(1))
        );
        assert!(Frame::decode(&[0, 1]).is_err());
    }

    #[test]
    fn test_from_parts_requires_exact_body() {
        let header = FrameHeader {
            tag: 0,
            body_len: 2,
        };
        assert!(Frame::from_parts(header, vec![1]).is_err());
        assert!(Frame::from_parts(header, vec![1, 2]).is_ok());
    }
}
