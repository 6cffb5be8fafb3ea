//! Blob objects.
//!
//! Any byte sequence is a valid blob; the only interesting operations are
//! wrapping content into an [`Object`] with the right kind.

use std::io;
use std::path::Path;

use crate::content::{BytesContent, ContentSource, FileContent};
use crate::kind::ObjectKind;
use crate::object::Object;

/// Wrap in-memory bytes as a blob object.
///
/// # Errors
///
/// None in practice; the signature matches the streaming constructors.
pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> io::Result<Object> {
    Object::new(ObjectKind::Blob, BytesContent::new(bytes.into()))
}

/// Wrap an on-disk file as a blob object without loading it.
///
/// The file is streamed once here (to hash it) and again whenever the
/// content is consumed.
///
/// # Errors
///
/// I/O errors from `stat` or reading.
pub fn from_file(path: impl AsRef<Path>) -> io::Result<Object> {
    Object::new(ObjectKind::Blob, FileContent::open_path(path.as_ref())?)
}

/// Wrap any content source as a blob object.
///
/// # Errors
///
/// I/O errors from the source while hashing.
pub fn from_content(content: impl ContentSource + 'static) -> io::Result<Object> {
    Object::new(ObjectKind::Blob, content)
}
