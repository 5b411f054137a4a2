//! Consistent Overhead Byte Stuffing.
//!
//! COBS rewrites a byte sequence so that it contains no `0x00`, which frees the zero byte to
//! act as an unambiguous frame delimiter on a byte stream. The stuffing itself is done by the
//! [`cobs`](::cobs) crate; this module adds the frame conventions on top:
//!
//! - [`encode`]: stuffs a buffer and appends the `0x00` delimiter
//! - [`decode`]: reverses [`encode`] into a separate buffer
//! - [`decode_in_place`]: reverses [`encode`] inside the receive buffer
//! - [`max_encoded_len`]: worst case output size, usable in array lengths
//!
//! ## Failure behaviour
//!
//! Sizes and stray zero bytes are checked before anything is written. If the stuffed data
//! turns out to be malformed while decoding, the span that was being decoded into is zeroed.

use crate::consts::{COBS_MAX_BLOCK_LEN, FRAME_DELIMITER};
use crate::error::CobsError;

/// Worst case size of `encode` output for `len` input bytes, trailing delimiter included.
///
/// The stuffed body is at most `len + len / 254 + 1` bytes; one more byte holds the delimiter.
pub const fn max_encoded_len(len: usize) -> usize {
    len + len / COBS_MAX_BLOCK_LEN + 2
}

/// Stuffs `input` into `output` and appends the `0x00` delimiter.
///
/// # Returns
/// The number of bytes written, delimiter included. Encoding an empty input writes
/// `[0x01, 0x00]`.
///
/// # Errors
/// [`CobsError::OutputTooSmall`] if `output` is shorter than [`max_encoded_len`] of the
/// input. Nothing is written in that case.
pub fn encode(input: &[u8], output: &mut [u8]) -> Result<usize, CobsError> {
    let required = max_encoded_len(input.len());
    let available = output.len();
    if available < required {
        return Err(CobsError::OutputTooSmall {
            required,
            available,
        });
    }

    let n = ::cobs::try_encode(input, output).map_err(|_| CobsError::OutputTooSmall {
        required,
        available,
    })?;
    match output.get_mut(n) {
        Some(slot) => *slot = FRAME_DELIMITER,
        None => {
            return Err(CobsError::OutputTooSmall {
                required,
                available,
            });
        }
    }
    Ok(n + 1)
}

/// Strips one trailing delimiter and rejects bodies the stuffing could never have produced.
fn stuffed_body(input: &[u8]) -> Result<&[u8], CobsError> {
    let body = match input.split_last() {
        Some((&FRAME_DELIMITER, body)) => body,
        _ => input,
    };
    if body.is_empty() {
        return Err(CobsError::Empty);
    }
    match body.iter().position(|&b| b == FRAME_DELIMITER) {
        Some(offset) => Err(CobsError::UnexpectedZero { offset }),
        None => Ok(body),
    }
}

/// Decodes a stuffed frame from `input` into `output`.
///
/// `input` may end with the `0x00` delimiter; it is ignored.
///
/// # Returns
/// The number of decoded bytes written to `output`.
///
/// # Errors
/// - [`CobsError::Empty`] if there is no stuffed body
/// - [`CobsError::UnexpectedZero`] for a zero byte inside the body, a zero code byte included
/// - [`CobsError::OutputTooSmall`] if `output` is shorter than the body minus its first code
///   byte; `output` is untouched
/// - [`CobsError::Malformed`] if a code byte runs past the end of the body; the first
///   `input.len() - 1` bytes of `output` are zeroed
pub fn decode(input: &[u8], output: &mut [u8]) -> Result<usize, CobsError> {
    let body = stuffed_body(input)?;
    // Each block spends one code byte and implies at most one zero, so decoding never grows.
    let required = body.len() - 1;
    if output.len() < required {
        return Err(CobsError::OutputTooSmall {
            required,
            available: output.len(),
        });
    }

    match ::cobs::decode(body, output) {
        Ok(n) => Ok(n),
        Err(_) => {
            output[..required].fill(0);
            Err(CobsError::Malformed)
        }
    }
}

/// Decodes a stuffed frame in place.
///
/// `buf` may end with the `0x00` delimiter. On success the decoded bytes occupy
/// `buf[..n]` where `n` is the returned length. Size and zero-byte errors leave `buf`
/// untouched; on [`CobsError::Malformed`] the stuffed body is zeroed.
pub fn decode_in_place(buf: &mut [u8]) -> Result<usize, CobsError> {
    let body_len = stuffed_body(buf)?.len();
    let body = &mut buf[..body_len];
    match ::cobs::decode_in_place(body) {
        Ok(n) => Ok(n),
        Err(_) => {
            body.fill(0);
            Err(CobsError::Malformed)
        }
    }
}
