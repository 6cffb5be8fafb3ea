//! The git directory cache (the index).
//!
//! A [`DirCache`] is a purely functional value: a version tag plus a
//! strictly sorted vector of entries. Mutation operations return new
//! caches. The on-disk form is the binary v2 `DIRC` layout, always framed
//! by a trailing SHA-1 that the [`hashio`] stream wrappers compute and
//! verify.
//!
//! # Crate layout
//!
//! - [`entry`] — [`DirCacheEntry`] and its packed flags.
//! - [`cache`] — [`DirCache`]: invariants, add/remove, merge queries.
//! - [`hashio`] — trailing-hash read/write streams.
//! - [`codec`] — the v2 binary reader and writer.
//! - [`tree_builder`] — materializing a cache into tree objects.

pub mod cache;
pub mod codec;
pub mod entry;
pub mod error;
pub mod hashio;
pub mod tree_builder;

pub use cache::{DirCache, RemoveKey, StageSelector};
pub use entry::DirCacheEntry;
pub use error::IndexError;
pub use hashio::{
    HashingReader, HashingWriter, PlainInput, PlainOutput, TrailerError, TrailingHashInput,
    TrailingHashOutput,
};
pub use tree_builder::{to_tree_objects, TreeForPrefix};

/// Hard cap on the number of entries the codec will read or write.
pub const MAX_ENTRIES: u32 = 100_000;
