//! Primitive field encoders and decoders.
//!
//! Everything here is a pure function over byte buffers with an explicit
//! offset; nothing performs I/O. Encoders check their length budget before
//! writing a single byte, and decoders check the declared length against
//! the buffer before reading, so a call either succeeds completely or
//! leaves nothing behind.
//!
//! ```text
//! u16            [hi][lo]
//! byte-string    [len = 1 + n][n ASCII bytes]
//! string array   [count C][len_0 .. len_C-1][byte-string_0 .. byte-string_C-1]
//! ```

use crate::ProtocolError;

/// Size of the length header in front of every byte-string.
pub const BYTE_STRING_HEADER_SIZE: usize = 1;

/// Longest payload a byte-string can carry (header + payload <= 255).
pub const MAX_BYTE_STRING_LEN: usize = u8::MAX as usize - BYTE_STRING_HEADER_SIZE;

/// Most elements a string array can carry.
pub const MAX_ARRAY_LEN: usize = u8::MAX as usize;

// ---------------------------------------------------------------------------
// u16
// ---------------------------------------------------------------------------

/// Writes `value` big-endian into `buf[offset..offset + 2]`.
pub fn encode_u16_be(
    value: u16,
    buf: &mut [u8],
    offset: usize,
) -> Result<(), ProtocolError> {
    let available = buf.len();
    let window = buf
        .get_mut(offset..offset + 2)
        .ok_or(ProtocolError::Truncated {
            needed: offset + 2,
            available,
        })?;
    window.copy_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Reads a big-endian `u16` from `buf[offset..offset + 2]`.
pub fn decode_u16_be(buf: &[u8], offset: usize) -> Result<u16, ProtocolError> {
    match buf.get(offset..offset + 2) {
        Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(ProtocolError::Truncated {
            needed: offset + 2,
            available: buf.len(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Byte-strings
// ---------------------------------------------------------------------------

/// Number of bytes `value` occupies once encoded as a byte-string.
pub fn byte_string_len(value: &str) -> usize {
    BYTE_STRING_HEADER_SIZE + value.len()
}

/// Appends `value` to `out` as a byte-string. Returns the stream length
/// written (which is also the header byte).
pub fn encode_byte_string(
    value: &str,
    out: &mut Vec<u8>,
) -> Result<usize, ProtocolError> {
    check_byte_string(value)?;
    let stream_len = byte_string_len(value);
    out.reserve(stream_len);
    // check_byte_string bounds stream_len to 255.
    out.push(stream_len as u8);
    out.extend_from_slice(value.as_bytes());
    Ok(stream_len)
}

/// Decodes the byte-string starting at `buf[start]`.
///
/// Returns the string and its stream length (header included), which is
/// how far the caller should advance.
pub fn decode_byte_string(
    buf: &[u8],
    start: usize,
) -> Result<(String, usize), ProtocolError> {
    let stream_len = *buf.get(start).ok_or(ProtocolError::Truncated {
        needed: start + 1,
        available: buf.len(),
    })? as usize;
    if stream_len == 0 {
        return Err(ProtocolError::ZeroLengthHeader);
    }

    let end = start + stream_len;
    let payload = buf
        .get(start + BYTE_STRING_HEADER_SIZE..end)
        .ok_or(ProtocolError::Truncated {
            needed: end,
            available: buf.len(),
        })?;
    if !payload.is_ascii() {
        return Err(ProtocolError::NonAscii);
    }

    let value = std::str::from_utf8(payload)
        .map_err(|_| ProtocolError::NonAscii)?
        .to_owned();
    Ok((value, stream_len))
}

fn check_byte_string(value: &str) -> Result<(), ProtocolError> {
    if value.len() > MAX_BYTE_STRING_LEN {
        return Err(ProtocolError::StringTooLong(value.len()));
    }
    if !value.is_ascii() {
        return Err(ProtocolError::NonAscii);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// String arrays
// ---------------------------------------------------------------------------

/// Number of bytes `values` occupies once encoded as a string array.
pub fn string_array_len<S: AsRef<str>>(values: &[S]) -> usize {
    1 + values.len()
        + values
            .iter()
            .map(|v| byte_string_len(v.as_ref()))
            .sum::<usize>()
}

/// Appends `values` to `out` as a string array. Returns the bytes written.
pub fn encode_string_array<S: AsRef<str>>(
    values: &[S],
    out: &mut Vec<u8>,
) -> Result<usize, ProtocolError> {
    if values.len() > MAX_ARRAY_LEN {
        return Err(ProtocolError::ArrayTooLong(values.len()));
    }
    for value in values {
        check_byte_string(value.as_ref())?;
    }

    let total = string_array_len(values);
    out.reserve(total);
    out.push(values.len() as u8);
    for value in values {
        out.push(byte_string_len(value.as_ref()) as u8);
    }
    for value in values {
        encode_byte_string(value.as_ref(), out)?;
    }
    Ok(total)
}

/// Decodes the string array starting at `buf[start]`.
///
/// Returns the elements and the number of bytes the array occupies.
pub fn decode_string_array(
    buf: &[u8],
    start: usize,
) -> Result<(Vec<String>, usize), ProtocolError> {
    let count = *buf.get(start).ok_or(ProtocolError::Truncated {
        needed: start + 1,
        available: buf.len(),
    })? as usize;

    let lengths_start = start + 1;
    let body_start = lengths_start + count;
    let lengths =
        buf.get(lengths_start..body_start)
            .ok_or(ProtocolError::Truncated {
                needed: body_start,
                available: buf.len(),
            })?;

    let body_len: usize = lengths.iter().map(|&l| l as usize).sum();
    let end = body_start + body_len;
    if end > buf.len() {
        return Err(ProtocolError::Truncated {
            needed: end,
            available: buf.len(),
        });
    }

    let mut values = Vec::with_capacity(count);
    let mut offset = body_start;
    for (index, &expected) in lengths.iter().enumerate() {
        if expected == 0 {
            return Err(ProtocolError::ZeroLengthHeader);
        }
        // Never read past this element's slot, even if its own header lies.
        let slot = &buf[..offset + expected as usize];
        let (value, declared) = decode_byte_string(slot, offset)?;
        if declared != expected as usize {
            return Err(ProtocolError::ArrayLengthMismatch {
                index,
                declared,
                expected: expected as usize,
            });
        }
        values.push(value);
        offset += declared;
    }

    Ok((values, end - start))
}

/// Fails with [`ProtocolError::TrailingBytes`] unless `consumed` is the
/// whole body.
pub fn expect_consumed(body: &[u8], consumed: usize) -> Result<(), ProtocolError> {
    match body.len().checked_sub(consumed) {
        Some(0) => Ok(()),
        Some(extra) => Err(ProtocolError::TrailingBytes(extra)),
        None => Err(ProtocolError::Truncated {
            needed: consumed,
            available: body.len(),
        }),
    }
}
