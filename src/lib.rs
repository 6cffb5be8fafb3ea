//! plinth — pure-library git plumbing.
//!
//! This crate is the repository boundary over the subsystem crates: the
//! [`ObjectDatabase`]/[`Repository`] traits every backend implements, the
//! on-disk loose-object store, the pack-aware filesystem database, an
//! in-memory repository for tests and embedders, validated ref values,
//! and the [`WorkingTree`] bridge between tree objects and the directory
//! cache.
//!
//! The subsystem crates are re-exported under short names so most users
//! depend on `plinth` alone:
//!
//! - [`object`] — blob/tree/commit/tag values, ids, content sources.
//! - [`index`] — the directory cache and its binary codec.
//! - [`config`] — the line-preserving config codec and per-path store.
//! - [`pack`] — read-side pack access.
//! - [`path`] — the portable path grammar and orderings.
//!
//! No operation here starts threads or installs global state; the only
//! serialized resource is the per-path config handle in
//! [`config::store`].

pub use plinth_config as config;
pub use plinth_index as index;
pub use plinth_object as object;
pub use plinth_pack as pack;
pub use plinth_path as path;

pub mod error;
pub mod loose;
pub mod memory;
pub mod odb;
pub mod refs;
pub mod repo;
pub mod worktree;

pub use error::RepoError;
pub use loose::LooseStore;
pub use memory::MemoryRepository;
pub use odb::FsObjectDatabase;
pub use refs::{Ref, RefTarget};
pub use repo::{require_working_tree, ObjectDatabase, RefPutOptions, Repository};
pub use worktree::{FsWorkingTree, ReadTreeOptions, WorkingTree, WriteTreeOptions};
