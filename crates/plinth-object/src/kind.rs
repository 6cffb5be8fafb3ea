//! The four git object kinds.

use std::fmt;

use crate::error::ObjectError;

/// The kind tag of a git object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Opaque file content.
    Blob,
    /// A directory snapshot.
    Tree,
    /// A snapshot plus history metadata.
    Commit,
    /// An annotated pointer at another object.
    Tag,
}

impl ObjectKind {
    /// The lowercase ASCII name used in object headers.
    #[must_use]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Blob => b"blob",
            Self::Tree => b"tree",
            Self::Commit => b"commit",
            Self::Tag => b"tag",
        }
    }

    /// The lowercase name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parse an object-kind name.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidFormat`] for anything but the four lowercase
    /// names.
    pub fn from_bytes(name: &[u8]) -> Result<Self, ObjectError> {
        match name {
            b"blob" => Ok(Self::Blob),
            b"tree" => Ok(Self::Tree),
            b"commit" => Ok(Self::Commit),
            b"tag" => Ok(Self::Tag),
            other => Err(ObjectError::InvalidFormat {
                reason: format!("unknown object kind {:?}", String::from_utf8_lossy(other)),
            }),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
