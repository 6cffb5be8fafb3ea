//! Author, committer, and tagger identities.

use bstr::{BString, ByteSlice};

use crate::parse;

/// A person plus the moment they acted.
///
/// `when_ms` is milliseconds since the epoch; the external form carries
/// whole seconds. The timezone is minutes east of UTC.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersonIdent {
    /// Display name, raw bytes.
    pub name: BString,
    /// Email address, raw bytes.
    pub email: BString,
    /// Milliseconds since the Unix epoch.
    pub when_ms: i64,
    /// Timezone offset in minutes east of UTC.
    pub tz_offset_minutes: i32,
}

impl PersonIdent {
    /// Create an identity.
    #[must_use]
    pub fn new(
        name: impl Into<BString>,
        email: impl Into<BString>,
        when_ms: i64,
        tz_offset_minutes: i32,
    ) -> Self {
        Self { name: name.into(), email: email.into(), when_ms, tz_offset_minutes }
    }

    /// True when rendering this identity loses nothing: name and email are
    /// already in sanitized form.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        sanitize(&self.name) == self.name && sanitize(&self.email) == self.email
    }

    /// Render the external form:
    /// `{name} <{email}> {seconds} {±HHMM}`.
    ///
    /// Name and email are sanitized on the way out, so the result always
    /// parses back.
    #[must_use]
    pub fn to_external_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&sanitize(&self.name));
        out.extend_from_slice(b" <");
        out.extend_from_slice(&sanitize(&self.email));
        out.extend_from_slice(b"> ");
        out.extend_from_slice(self.when_seconds().to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(format_tz(self.tz_offset_minutes).as_bytes());
        out
    }

    /// Whole seconds since the epoch, as serialized.
    #[must_use]
    pub fn when_seconds(&self) -> i64 {
        self.when_ms.div_euclid(1000)
    }

    /// Parse the external form, leniently.
    ///
    /// Whitespace around the angle brackets is absorbed; garbage between
    /// `>` and the timestamp is tolerated; a missing timestamp or timezone
    /// yields zero rather than an error. Only a line with no `<…>` bracket
    /// at all yields `None`. When several bracketed emails appear, the
    /// first wins.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let lt = bytes.iter().position(|&b| b == b'<')?;
        let gt_rel = bytes[lt + 1..].iter().position(|&b| b == b'>')?;
        let gt = lt + 1 + gt_rel;

        let name = bytes[..lt].trim().as_bstr().to_owned();
        let email = bytes[lt + 1..gt].trim().as_bstr().to_owned();

        let (when_ms, tz_offset_minutes) = parse_time_tail(&bytes[gt + 1..]);
        Some(Self { name, email, when_ms, tz_offset_minutes })
    }
}

impl std::fmt::Display for PersonIdent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_external_bytes().as_bstr())
    }
}

/// Strip control bytes (except TAB), `<`, `>`, and edge whitespace.
fn sanitize(raw: &[u8]) -> BString {
    let kept: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|&b| !(b < 0x20 && b != b'\t') && b != b'<' && b != b'>')
        .collect();
    kept.trim().as_bstr().to_owned()
}

/// `{seconds} {±HHMM}` after the closing bracket, both parts optional.
fn parse_time_tail(tail: &[u8]) -> (i64, i32) {
    let mut fields = tail.fields();
    let seconds = loop {
        match fields.next() {
            Some(field) => {
                if let Some(secs) = parse::parse_u64_decimal(field) {
                    break i64::try_from(secs).unwrap_or(0);
                }
                // Garbage between the bracket and the numbers; keep looking.
            }
            None => return (0, 0),
        }
    };
    let tz = fields.next().and_then(parse_tz).unwrap_or(0);
    (seconds.saturating_mul(1000), tz)
}

/// `±HHMM` as minutes east of UTC.
fn parse_tz(field: &[u8]) -> Option<i32> {
    if field.len() != 5 {
        return None;
    }
    let sign = match field[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    if !field[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let hours = i32::from(field[1] - b'0') * 10 + i32::from(field[2] - b'0');
    let minutes = i32::from(field[3] - b'0') * 10 + i32::from(field[4] - b'0');
    Some(sign * (hours * 60 + minutes))
}

fn format_tz(offset_minutes: i32) -> String {
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let magnitude = offset_minutes.abs();
    format!("{sign}{:02}{:02}", magnitude / 60, magnitude % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> PersonIdent {
        PersonIdent::new("A. U. Thor", "author@example.com", 1_142_878_449_000, 150)
    }

    // -- rendering --

    #[test]
    fn renders_external_form() {
        assert_eq!(
            author().to_external_bytes(),
            b"A. U. Thor <author@example.com> 1142878449 +0230"
        );
    }

    #[test]
    fn renders_negative_timezone() {
        let ident = PersonIdent::new("X", "x@y", 0, -90);
        assert_eq!(ident.to_external_bytes(), b"X <x@y> 0 -0130");
    }

    #[test]
    fn sanitizes_on_render() {
        let ident = PersonIdent::new(" A <evil>\x01Name\n ", "a\x7f@b", 1000, 0);
        // 0x7F is not in the stripped range; only 0x00..0x1F (minus TAB) goes.
        assert_eq!(ident.to_external_bytes(), b"A evilName <a\x7f@b> 1 +0000");
    }

    #[test]
    fn millisecond_floor_division() {
        assert_eq!(PersonIdent::new("a", "b", 1999, 0).when_seconds(), 1);
        assert_eq!(PersonIdent::new("a", "b", -1999, 0).when_seconds(), -2);
    }

    // -- parsing --

    #[test]
    fn parses_canonical_form() {
        let parsed =
            PersonIdent::parse(b"A. U. Thor <author@example.com> 1142878449 +0230").unwrap();
        assert_eq!(parsed, author());
    }

    #[test]
    fn parse_render_roundtrip() {
        let ident = author();
        assert_eq!(PersonIdent::parse(&ident.to_external_bytes()).unwrap(), ident);
    }

    #[test]
    fn absorbs_whitespace_around_brackets() {
        let parsed = PersonIdent::parse(b"Name   < email@x >  42 -0500").unwrap();
        assert_eq!(parsed.name, "Name");
        assert_eq!(parsed.email, "email@x");
        assert_eq!(parsed.when_ms, 42_000);
        assert_eq!(parsed.tz_offset_minutes, -300);
    }

    #[test]
    fn missing_bracket_is_none() {
        assert!(PersonIdent::parse(b"no email here 123 +0000").is_none());
        assert!(PersonIdent::parse(b"unclosed <a@b 123 +0000").is_none());
    }

    #[test]
    fn missing_numbers_default_to_zero() {
        let parsed = PersonIdent::parse(b"Name <a@b>").unwrap();
        assert_eq!((parsed.when_ms, parsed.tz_offset_minutes), (0, 0));
        let parsed = PersonIdent::parse(b"Name <a@b> 77").unwrap();
        assert_eq!((parsed.when_ms, parsed.tz_offset_minutes), (77_000, 0));
    }

    #[test]
    fn tolerates_garbage_before_numbers() {
        let parsed = PersonIdent::parse(b"A <a@x>, B b@y 1234 +0100").unwrap();
        assert_eq!(parsed.email, "a@x");
        assert_eq!(parsed.when_ms, 1_234_000);
        assert_eq!(parsed.tz_offset_minutes, 60);
    }

    #[test]
    fn first_bracketed_email_wins() {
        let parsed = PersonIdent::parse(b"A <a@x>, Co Author <co@y> 99 +0000").unwrap();
        assert_eq!(parsed.email, "a@x");
        assert_eq!(parsed.when_ms, 99_000);
    }

    #[test]
    fn malformed_timezone_defaults_to_zero() {
        let parsed = PersonIdent::parse(b"A <a@x> 50 0230").unwrap();
        assert_eq!(parsed.tz_offset_minutes, 0);
        let parsed = PersonIdent::parse(b"A <a@x> 50 +023").unwrap();
        assert_eq!(parsed.tz_offset_minutes, 0);
    }

    #[test]
    fn validity_tracks_sanitization() {
        assert!(author().is_valid());
        assert!(!PersonIdent::new("bad<name", "a@b", 0, 0).is_valid());
        assert!(!PersonIdent::new(" padded ", "a@b", 0, 0).is_valid());
    }
}
