//! Annotated tag objects.

use std::io;

use bstr::{BString, ByteSlice};

use crate::content::BytesContent;
use crate::error::ObjectError;
use crate::id::ObjectId;
use crate::kind::ObjectKind;
use crate::object::Object;
use crate::parse::{header_value, take_line};
use crate::person::PersonIdent;

/// An annotated tag: a named, messaged pointer at another object.
///
/// `tagger` is optional — tags created before git recorded taggers have
/// none — but when present it must be a canonical identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// The tagged object.
    pub object: ObjectId,
    /// The kind of the tagged object.
    pub target_kind: ObjectKind,
    /// Tag name, raw bytes, never empty.
    pub name: BString,
    /// Who created the tag, if recorded.
    pub tagger: Option<PersonIdent>,
    /// Tag message, raw bytes, never empty.
    pub message: BString,
}

impl Tag {
    /// Build a tag, validating its invariants.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidTag`] on a zero object id, an empty or
    /// newline-bearing name, an unsanitized tagger, or an empty message.
    pub fn new(
        object: ObjectId,
        target_kind: ObjectKind,
        name: impl Into<BString>,
        tagger: Option<PersonIdent>,
        message: impl Into<BString>,
    ) -> Result<Self, ObjectError> {
        let tag = Self { object, target_kind, name: name.into(), tagger, message: message.into() };
        tag.validate()?;
        Ok(tag)
    }

    fn validate(&self) -> Result<(), ObjectError> {
        let invalid = |reason: String| ObjectError::InvalidTag { reason };
        if self.object.is_zero() {
            return Err(invalid("zero object id".to_owned()));
        }
        if self.name.is_empty() {
            return Err(invalid("empty tag name".to_owned()));
        }
        if self.name.contains(&b'\n') {
            return Err(invalid("tag name contains a newline".to_owned()));
        }
        if let Some(tagger) = &self.tagger {
            if !tagger.is_valid() {
                return Err(invalid("tagger identity is not in canonical form".to_owned()));
            }
        }
        if self.message.is_empty() {
            return Err(invalid("empty message".to_owned()));
        }
        Ok(())
    }

    /// Canonical serialization.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"object ");
        out.extend_from_slice(self.object.to_hex().as_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"type ");
        out.extend_from_slice(self.target_kind.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"tag ");
        out.extend_from_slice(&self.name);
        out.push(b'\n');
        if let Some(tagger) = &self.tagger {
            out.extend_from_slice(b"tagger ");
            out.extend_from_slice(&tagger.to_external_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// Parse the canonical serialization.
    ///
    /// A missing `tagger` header is legal; a present-but-malformed one is
    /// an error.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidTag`].
    pub fn parse(bytes: &[u8]) -> Result<Self, ObjectError> {
        let invalid = |reason: &str| ObjectError::InvalidTag { reason: reason.to_owned() };

        let (line, rest) = take_line(bytes).ok_or_else(|| invalid("missing object header"))?;
        let object_hex =
            header_value(line, b"object").ok_or_else(|| invalid("missing object header"))?;
        let object = ObjectId::from_hex(object_hex).map_err(|_| invalid("malformed object id"))?;

        let (line, rest) = take_line(rest).ok_or_else(|| invalid("missing type header"))?;
        let kind_name = header_value(line, b"type").ok_or_else(|| invalid("missing type header"))?;
        let target_kind =
            ObjectKind::from_bytes(kind_name).map_err(|_| invalid("unknown target type"))?;

        let (line, rest) = take_line(rest).ok_or_else(|| invalid("missing tag header"))?;
        let name = header_value(line, b"tag").ok_or_else(|| invalid("missing tag header"))?;

        let (tagger, rest) = match take_line(rest) {
            Some((line, next)) if line.starts_with(b"tagger") => {
                let raw = header_value(line, b"tagger")
                    .ok_or_else(|| invalid("malformed tagger header"))?;
                let tagger =
                    PersonIdent::parse(raw).ok_or_else(|| invalid("malformed tagger identity"))?;
                (Some(tagger), next)
            }
            _ => (None, rest),
        };

        let message = rest
            .strip_prefix(b"\n")
            .ok_or_else(|| invalid("unknown header before message separator"))?;

        Self::new(object, target_kind, name.as_bstr(), tagger, message.as_bstr())
    }

    /// Wrap the serialization into an [`Object`], computing its id.
    ///
    /// # Errors
    ///
    /// I/O errors from hashing (none in practice for in-memory content).
    pub fn to_object(&self) -> io::Result<Object> {
        Object::new(ObjectKind::Tag, BytesContent::new(self.serialize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger() -> PersonIdent {
        PersonIdent::new("T Agger", "tagger@example.com", 1_500_000_000_000, 0)
    }

    fn target() -> ObjectId {
        ObjectId::from_bytes([0xAA; 20])
    }

    #[test]
    fn serialize_parse_roundtrip() {
        let tag =
            Tag::new(target(), ObjectKind::Commit, "v1.0.0", Some(tagger()), "release\n").unwrap();
        assert_eq!(Tag::parse(&tag.serialize()).unwrap(), tag);
    }

    #[test]
    fn roundtrip_without_tagger() {
        let tag = Tag::new(target(), ObjectKind::Blob, "old-style", None, "msg\n").unwrap();
        let raw = tag.serialize();
        assert!(!raw.windows(6).any(|w| w == b"tagger"));
        assert_eq!(Tag::parse(&raw).unwrap(), tag);
    }

    #[test]
    fn serialized_layout() {
        let tag = Tag::new(target(), ObjectKind::Commit, "v2", Some(tagger()), "m\n").unwrap();
        let expected = b"object aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\n\
            type commit\n\
            tag v2\n\
            tagger T Agger <tagger@example.com> 1500000000 +0000\n\
            \n\
            m\n";
        assert_eq!(tag.serialize(), expected);
    }

    #[test]
    fn rejects_malformed_tagger_line() {
        let raw = b"object aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\n\
            type commit\n\
            tag v2\n\
            tagger nobody without brackets\n\
            \n\
            m\n";
        assert!(matches!(Tag::parse(raw), Err(ObjectError::InvalidTag { .. })));
    }

    #[test]
    fn rejects_missing_headers() {
        assert!(Tag::parse(b"").is_err());
        let no_type = b"object aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\n\ntag v2\n\nm\n";
        assert!(Tag::parse(no_type).is_err());
    }

    #[test]
    fn rejects_invalid_fields() {
        assert!(Tag::new(ObjectId::ZERO, ObjectKind::Commit, "v", None, "m\n").is_err());
        assert!(Tag::new(target(), ObjectKind::Commit, "", None, "m\n").is_err());
        assert!(Tag::new(target(), ObjectKind::Commit, "v\nx", None, "m\n").is_err());
        assert!(Tag::new(target(), ObjectKind::Commit, "v", None, "").is_err());
        let bad = PersonIdent::new("x<", "a@b", 0, 0);
        assert!(Tag::new(target(), ObjectKind::Commit, "v", Some(bad), "m\n").is_err());
    }
}
