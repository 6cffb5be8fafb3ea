//! Shared byte-parsing helpers for the wire codecs.

/// Split at the first occurrence of `delim`, excluding it from both halves.
#[must_use]
pub fn split_once(bytes: &[u8], delim: u8) -> Option<(&[u8], &[u8])> {
    let pos = bytes.iter().position(|&b| b == delim)?;
    Some((&bytes[..pos], &bytes[pos + 1..]))
}

/// Take one LF-terminated line, returning `(line, rest)` without the LF.
#[must_use]
pub fn take_line(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    split_once(bytes, b'\n')
}

/// If `bytes` begins with `key` followed by a space, return the remainder.
#[must_use]
pub fn header_value<'a>(bytes: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    let rest = bytes.strip_prefix(key)?;
    rest.strip_prefix(b" ")
}

/// Parse a non-empty ASCII-decimal unsigned number. Overflow fails.
#[must_use]
pub fn parse_u64_decimal(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut value: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
    }
    Some(value)
}

/// Parse a decimal signed number with an optional leading `-`.
#[must_use]
pub fn parse_i64_decimal(bytes: &[u8]) -> Option<i64> {
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, bytes),
    };
    let magnitude = i64::try_from(parse_u64_decimal(digits)?).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Read a big-endian u32 at `offset`.
#[must_use]
pub fn u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes(slice.try_into().ok()?))
}

/// Read a big-endian u16 at `offset`.
#[must_use]
pub fn u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    let slice = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes(slice.try_into().ok()?))
}

/// Read a big-endian u64 at `offset`.
#[must_use]
pub fn u64_be(bytes: &[u8], offset: usize) -> Option<u64> {
    let slice = bytes.get(offset..offset + 8)?;
    Some(u64::from_be_bytes(slice.try_into().ok()?))
}
