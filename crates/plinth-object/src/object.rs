//! The object value: a kind, an id, and a content source.

use std::io::{self, Read};
use std::sync::Arc;

use sha1::{Digest, Sha1};

use crate::content::{read_to_bytes, ContentSource};
use crate::id::ObjectId;
use crate::kind::ObjectKind;

/// Compute the id of an object: the SHA-1 of
/// `"{kind} {size}\0{content}"`, fed to the hasher incrementally.
///
/// # Errors
///
/// I/O errors from the content source.
pub fn id_for(kind: ObjectKind, content: &dyn ContentSource) -> io::Result<ObjectId> {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_bytes());
    hasher.update(b" ");
    hasher.update(content.len().to_string().as_bytes());
    hasher.update(b"\0");

    let mut reader = content.open()?;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(ObjectId::from_bytes(hasher.finalize().into()))
}

/// A git object as a pure value.
///
/// Construction computes the id from the content; the content itself stays
/// behind its [`ContentSource`], so an `Object` over a large file is cheap
/// to hold and clone.
#[derive(Clone)]
pub struct Object {
    kind: ObjectKind,
    id: ObjectId,
    content: Arc<dyn ContentSource>,
}

impl Object {
    /// Build an object, computing its id by streaming the content once.
    ///
    /// # Errors
    ///
    /// I/O errors from the content source.
    pub fn new(kind: ObjectKind, content: impl ContentSource + 'static) -> io::Result<Self> {
        let id = id_for(kind, &content)?;
        Ok(Self { kind, id, content: Arc::new(content) })
    }

    /// Build an object whose id is already known and trusted — for readers
    /// that looked the id up (pack index, loose filename) and should not
    /// pay a second content pass.
    #[must_use]
    pub fn with_id(kind: ObjectKind, id: ObjectId, content: impl ContentSource + 'static) -> Self {
        Self { kind, id, content: Arc::new(content) }
    }

    /// The object kind.
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The object id.
    #[must_use]
    pub const fn id(&self) -> ObjectId {
        self.id
    }

    /// Canonical content length in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.content.len()
    }

    /// The content source.
    #[must_use]
    pub fn content(&self) -> &dyn ContentSource {
        self.content.as_ref()
    }

    /// Drain the content into memory.
    ///
    /// # Errors
    ///
    /// I/O errors from the content source.
    pub fn data(&self) -> io::Result<Vec<u8>> {
        read_to_bytes(self.content.as_ref())
    }

    /// Re-derive the id from the content and compare it against the stored
    /// one. A mismatch means the content changed underneath a trusted id.
    ///
    /// # Errors
    ///
    /// I/O errors from the content source.
    pub fn verify_id(&self) -> io::Result<bool> {
        Ok(id_for(self.kind, self.content.as_ref())? == self.id)
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}
