//! The git object model.
//!
//! Pure value types for the four git object kinds and everything they are
//! built from: SHA-1 object ids, file modes, person identities, and the
//! canonical byte encodings. Content flows through the [`ContentSource`]
//! capability trait so large blobs never need to reside in memory; ids are
//! computed by streaming `"{kind} {size}\0{content}"` through SHA-1.
//!
//! Nothing here performs I/O beyond what a caller-supplied content source
//! does, and no value is shared mutable state — everything is safe to use
//! across threads.
//!
//! # Crate layout
//!
//! - [`id`] — [`ObjectId`], the 20-byte SHA-1 identity.
//! - [`kind`] — [`ObjectKind`], the four-way object tag.
//! - [`mode`] — [`FileMode`], tree-entry modes and their octal codec.
//! - [`content`] — the [`ContentSource`] trait and its byte/file backends.
//! - [`object`] — [`Object`], a kind + id + content source triple.
//! - [`person`] — [`PersonIdent`] parse/render.
//! - [`blob`], [`tree`], [`commit`], [`tag`] — per-kind codecs.
//! - [`loose`] — the `"{kind} {size}\0"` loose-object header.
//! - [`parse`] — shared byte-parsing helpers.

pub mod blob;
pub mod commit;
pub mod content;
pub mod error;
pub mod id;
pub mod kind;
pub mod loose;
pub mod mode;
pub mod object;
pub mod parse;
pub mod person;
pub mod tag;
pub mod tree;

pub use commit::Commit;
pub use content::{BytesContent, ContentSource, FileContent};
pub use error::ObjectError;
pub use id::ObjectId;
pub use kind::ObjectKind;
pub use mode::FileMode;
pub use object::{id_for, Object};
pub use person::PersonIdent;
pub use tag::Tag;
pub use tree::{Tree, TreeEntry, TreeEntryRef, TreeIter};
