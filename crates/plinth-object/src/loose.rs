//! The loose-object header: `"{kind} {size}\0"`.
//!
//! Loose files store this header followed by the content, all deflated.
//! The header is also exactly what gets hashed to form the object id, so
//! both the id computation and the loose codec share this shape.

use crate::error::ObjectError;
use crate::kind::ObjectKind;
use crate::parse::{parse_u64_decimal, split_once};

/// Largest header we are willing to scan for a NUL: `commit` plus a
/// 20-digit size with separators.
const MAX_HEADER_LEN: usize = 32;

/// Encode a loose-object header.
#[must_use]
pub fn encode_header(kind: ObjectKind, size: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_HEADER_LEN);
    out.extend_from_slice(kind.as_bytes());
    out.push(b' ');
    out.extend_from_slice(size.to_string().as_bytes());
    out.push(0);
    out
}

/// Decode a loose-object header from the start of an inflated stream.
///
/// Returns the kind, the declared content size, and the number of bytes
/// the header occupied (including the NUL).
///
/// # Errors
///
/// [`ObjectError::InvalidFormat`] when there is no NUL within range, the
/// kind is unknown, or the size is not a plain decimal.
pub fn decode_header(bytes: &[u8]) -> Result<(ObjectKind, u64, usize), ObjectError> {
    let scan = &bytes[..bytes.len().min(MAX_HEADER_LEN)];
    let (header, _) = split_once(scan, 0).ok_or_else(|| ObjectError::InvalidFormat {
        reason: "loose object header not NUL-terminated".to_owned(),
    })?;
    let (kind_name, size_digits) =
        split_once(header, b' ').ok_or_else(|| ObjectError::InvalidFormat {
            reason: "loose object header has no space".to_owned(),
        })?;
    let kind = ObjectKind::from_bytes(kind_name)?;
    let size = parse_u64_decimal(size_digits).ok_or_else(|| ObjectError::InvalidFormat {
        reason: format!("bad size in loose object header: {:?}", String::from_utf8_lossy(size_digits)),
    })?;
    Ok((kind, size, header.len() + 1))
}
