//! Object identity: the 20-byte SHA-1 digest.

use std::fmt;
use std::str::FromStr;

use crate::error::ObjectError;

/// A git object identifier (SHA-1, 20 bytes).
///
/// Stored as raw bytes for cheap comparison, hashing, and `Copy` semantics.
/// Displays as 40 lowercase hex characters. The all-zero value is reserved
/// to mean "absent" and is rejected everywhere an actual object is named.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// The zero id (`0000…0000`), the "absent" sentinel.
    pub const ZERO: Self = Self([0; 20]);

    /// Create an id from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create an id from a raw byte slice, failing unless it is exactly 20
    /// bytes long.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidObjectId`] on any other length.
    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, ObjectError> {
        let raw: [u8; 20] = bytes.try_into().map_err(|_| ObjectError::InvalidObjectId {
            value: bytes.into(),
            reason: format!("expected 20 raw bytes, got {}", bytes.len()),
        })?;
        Ok(Self(raw))
    }

    /// Parse a 40-character lowercase-hex id.
    ///
    /// Uppercase digits are rejected: the canonical form is lowercase and
    /// ids are compared byte-wise throughout.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidObjectId`] on wrong length or non-hex bytes.
    pub fn from_hex(hex: &[u8]) -> Result<Self, ObjectError> {
        if hex.len() != 40 {
            return Err(ObjectError::InvalidObjectId {
                value: hex.into(),
                reason: format!("expected 40 hex characters, got {}", hex.len()),
            });
        }
        let mut bytes = [0u8; 20];
        for (i, chunk) in hex.chunks_exact(2).enumerate() {
            let hi = hex_digit(chunk[0]);
            let lo = hex_digit(chunk[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => bytes[i] = (hi << 4) | lo,
                _ => {
                    return Err(ObjectError::InvalidObjectId {
                        value: hex.into(),
                        reason: "expected lowercase hex digits".to_owned(),
                    });
                }
            }
        }
        Ok(Self(bytes))
    }

    /// The raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// The 40-character lowercase-hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns true for the reserved all-zero id.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// The first byte, used by pack fanout tables.
    #[must_use]
    pub const fn first_byte(&self) -> u8 {
        self.0[0]
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = ObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.as_bytes())
    }
}
