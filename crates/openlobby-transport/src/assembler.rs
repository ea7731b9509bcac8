//! Incremental frame reassembly.
//!
//! A frame may arrive in any number of pieces. [`FrameAssembler`] keeps the
//! one frame currently being received and resumes it on every poll, reading
//! only the bytes that frame still needs. Bytes belonging to the next frame
//! stay in the socket until the current one is handed out, so a connection
//! never holds more than one partial frame.
//!
//! A header declaring a body too large for a frame is not fatal: the
//! declared bytes are read and thrown away, and assembly resumes at the
//! next header.
//!
//! ```text
//! AwaitingHeader { filled } ──4 bytes──→ AwaitingBody { header, filled }
//!     ↑    │                                       │
//!     │    └─oversized─→ Discarding { remaining }  │
//!     │                           │                │
//!     ├────── remaining == 0 ─────┘                │
//!     └──────────────── body complete: Frame ──────┘
//! ```

use std::io::{self, Read};

use openlobby_protocol::{Frame, FrameHeader, HEADER_SIZE, MAX_FRAME_SIZE};

use crate::TransportError;

enum AssemblyState {
    AwaitingHeader {
        buf: [u8; HEADER_SIZE],
        filled: usize,
    },
    AwaitingBody {
        header: FrameHeader,
        body: Vec<u8>,
        filled: usize,
    },
    Discarding {
        remaining: usize,
    },
}

impl AssemblyState {
    fn idle() -> Self {
        Self::AwaitingHeader {
            buf: [0; HEADER_SIZE],
            filled: 0,
        }
    }
}

/// Reassembles frames from a non-blocking byte source.
///
/// The source is any [`Read`] that reports "nothing more right now" with
/// [`io::ErrorKind::WouldBlock`] and end of stream with `Ok(0)`.
pub struct FrameAssembler {
    state: AssemblyState,
}

impl FrameAssembler {
    /// Creates an assembler with no frame in progress.
    pub fn new() -> Self {
        Self {
            state: AssemblyState::idle(),
        }
    }

    /// `true` when no bytes of a frame have been received yet.
    pub fn is_idle(&self) -> bool {
        matches!(
            self.state,
            AssemblyState::AwaitingHeader { filled: 0, .. }
        )
    }

    /// Reads what is available and returns the frame once it is complete.
    ///
    /// Returns `Ok(None)` when the source runs dry first; the bytes read so
    /// far are kept and the next call picks up from there.
    ///
    /// A frame whose header declares an oversized body is skipped; the
    /// poll carries on with whatever follows it.
    ///
    /// # Errors
    /// - [`TransportError::ConnectionClosed`] if the stream ended.
    /// - [`TransportError::ReceiveFailed`] for any other I/O error.
    pub fn poll<R: Read>(
        &mut self,
        source: &mut R,
    ) -> Result<Option<Frame>, TransportError> {
        loop {
            match &mut self.state {
                AssemblyState::AwaitingHeader { buf, filled } => {
                    if !fill(source, &mut buf[..], filled)? {
                        return Ok(None);
                    }
                    let header = FrameHeader::decode_unchecked(&buf[..])?;
                    if header.is_oversized() {
                        tracing::warn!(
                            tag = header.tag,
                            body_len = header.body_len(),
                            max_frame = MAX_FRAME_SIZE,
                            "skipping oversized frame"
                        );
                        self.state = AssemblyState::Discarding {
                            remaining: header.body_len(),
                        };
                        continue;
                    }
                    self.state = AssemblyState::AwaitingBody {
                        header,
                        body: vec![0; header.body_len()],
                        filled: 0,
                    };
                }
                AssemblyState::Discarding { remaining } => {
                    if !skip(source, remaining)? {
                        return Ok(None);
                    }
                    self.state = AssemblyState::idle();
                }
                AssemblyState::AwaitingBody {
                    header,
                    body,
                    filled,
                } => {
                    if !fill(source, body, filled)? {
                        return Ok(None);
                    }
                    let header = *header;
                    let body = std::mem::take(body);
                    self.state = AssemblyState::idle();
                    return Ok(Some(Frame::from_parts(header, body)?));
                }
            }
        }
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Fills `buf[*filled..]` from `source`. Returns `true` once `buf` is full,
/// `false` if the source would block first.
fn fill<R: Read>(
    source: &mut R,
    buf: &mut [u8],
    filled: &mut usize,
) -> Result<bool, TransportError> {
    while *filled < buf.len() {
        match source.read(&mut buf[*filled..]) {
            Ok(0) => {
                return Err(TransportError::ConnectionClosed(
                    "peer closed the stream".into(),
                ));
            }
            Ok(n) => *filled += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Ok(false);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::ReceiveFailed(e)),
        }
    }
    Ok(true)
}

/// Reads and drops up to `*remaining` bytes. Returns `true` once none are
/// left, `false` if the source would block first.
fn skip<R: Read>(
    source: &mut R,
    remaining: &mut usize,
) -> Result<bool, TransportError> {
    let mut scratch = [0u8; 4096];
    while *remaining > 0 {
        let want = (*remaining).min(scratch.len());
        let mut filled = 0;
        let done = fill(source, &mut scratch[..want], &mut filled)?;
        *remaining -= filled;
        if !done {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use openlobby_protocol::{
        HostRequest, LobbySearch, Reply, ReplyCode, Transmission,
    };

    use super::*;

    /// Hands out pre-cut chunks, one per `read` burst, and reports
    /// `WouldBlock` between them like an idle socket would.
    struct ChunkedSource {
        chunks: VecDeque<Vec<u8>>,
        ready: bool,
        closed: bool,
    }

    impl ChunkedSource {
        fn new(bytes: &[u8], chunk: usize) -> Self {
            Self {
                chunks: bytes.chunks(chunk).map(<[u8]>::to_vec).collect(),
                ready: true,
                closed: false,
            }
        }

        /// Lets the next chunk through (one "tick" of arrival).
        fn arrive(&mut self) {
            self.ready = true;
        }
    }

    impl Read for ChunkedSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() && self.closed {
                return Ok(0);
            }
            if !self.ready {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            let Some(front) = self.chunks.front_mut() else {
                return Err(io::ErrorKind::WouldBlock.into());
            };
            let n = buf.len().min(front.len());
            buf[..n].copy_from_slice(&front[..n]);
            front.drain(..n);
            if front.is_empty() {
                self.chunks.pop_front();
                self.ready = false;
            }
            Ok(n)
        }
    }

    fn host_frame() -> Frame {
        HostRequest::new("Alpha", "secret1", 8, true)
            .unwrap()
            .to_frame()
            .unwrap()
    }

    fn drive(source: &mut ChunkedSource) -> (Frame, usize) {
        let mut assembler = FrameAssembler::new();
        let mut polls = 0;
        loop {
            polls += 1;
            if let Some(frame) = assembler.poll(source).unwrap() {
                return (frame, polls);
            }
            source.arrive();
            assert!(polls < 10_000, "frame never completed");
        }
    }

    #[test]
    fn test_whole_frame_in_one_read() {
        let frame = host_frame();
        let mut source = ChunkedSource::new(&frame.to_bytes(), usize::MAX);
        let (decoded, polls) = drive(&mut source);
        assert_eq!(decoded, frame);
        assert_eq!(polls, 1);
    }

    #[test]
    fn test_any_chunk_size_yields_same_frame() {
        let frame = host_frame();
        let bytes = frame.to_bytes();
        for chunk in 1..=bytes.len() {
            let mut source = ChunkedSource::new(&bytes, chunk);
            let (decoded, _) = drive(&mut source);
            assert_eq!(decoded, frame, "chunk size {chunk}");
        }
    }

    #[test]
    fn test_one_byte_at_a_time_resumes_across_polls() {
        let frame = host_frame();
        let bytes = frame.to_bytes();
        let mut source = ChunkedSource::new(&bytes, 1);
        let mut assembler = FrameAssembler::new();

        for _ in 0..bytes.len() - 1 {
            assert!(assembler.poll(&mut source).unwrap().is_none());
            assert!(!assembler.is_idle());
            source.arrive();
        }
        assert_eq!(assembler.poll(&mut source).unwrap(), Some(frame));
        assert!(assembler.is_idle());
    }

    #[test]
    fn test_back_to_back_frames_come_out_in_order() {
        let first = LobbySearch::new("a").to_frame().unwrap();
        let second = Reply::new(ReplyCode::DisconnectInit).to_frame().unwrap();
        let mut bytes = first.to_bytes();
        bytes.extend(second.to_bytes());

        let mut source = ChunkedSource::new(&bytes, usize::MAX);
        let mut assembler = FrameAssembler::new();
        assert_eq!(assembler.poll(&mut source).unwrap(), Some(first));
        // The second frame was already buffered; it is still read one
        // frame per poll.
        assert_eq!(assembler.poll(&mut source).unwrap(), Some(second));
        assert_eq!(assembler.poll(&mut source).unwrap(), None);
    }

    #[test]
    fn test_empty_body_frame() {
        let bytes = [0, 1, 0, 0];
        let mut source = ChunkedSource::new(&bytes, usize::MAX);
        let frame = FrameAssembler::new().poll(&mut source).unwrap().unwrap();
        assert_eq!(frame.tag(), 1);
        assert!(frame.body().is_empty());
    }

    #[test]
    fn test_nothing_available() {
        let mut source = ChunkedSource::new(&[], 1);
        let mut assembler = FrameAssembler::new();
        assert!(assembler.poll(&mut source).unwrap().is_none());
        assert!(assembler.is_idle());
    }

    fn oversized_then(next: &Frame) -> Vec<u8> {
        let mut bytes = vec![0, 1, 0xFF, 0xFF];
        bytes.extend(std::iter::repeat_n(0xAA, 0xFFFF));
        bytes.extend(next.to_bytes());
        bytes
    }

    #[test]
    fn test_oversized_frame_is_skipped() {
        let next = LobbySearch::new("a").to_frame().unwrap();
        let mut source = ChunkedSource::new(&oversized_then(&next), usize::MAX);
        let mut assembler = FrameAssembler::new();
        assert_eq!(assembler.poll(&mut source).unwrap(), Some(next));
        assert!(assembler.is_idle());
    }

    #[test]
    fn test_oversized_frame_skipped_across_polls() {
        let next = host_frame();
        let mut source = ChunkedSource::new(&oversized_then(&next), 1000);
        let (decoded, polls) = drive(&mut source);
        assert_eq!(decoded, next);
        assert!(polls > 60);
    }

    #[test]
    fn test_stream_end_while_skipping() {
        let mut source = ChunkedSource::new(&[0, 1, 0xFF, 0xFF, 1, 2, 3], usize::MAX);
        source.closed = true;
        let err = FrameAssembler::new().poll(&mut source).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed(_)));
    }

    #[test]
    fn test_stream_end_mid_frame() {
        let mut source = ChunkedSource::new(&[0, 3, 0, 1], usize::MAX);
        source.closed = true;
        let err = FrameAssembler::new().poll(&mut source).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed(_)));
    }
}
