//! Errors for the repository boundary.

use std::path::PathBuf;

use plinth_object::{ObjectId, ObjectKind};
use thiserror::Error;

/// Errors returned by [`Repository`](crate::Repository) and
/// [`WorkingTree`](crate::WorkingTree) operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// No object with this id exists in the database.
    #[error("object {id} not found")]
    NotFound {
        /// The id that was asked for.
        id: ObjectId,
    },

    /// An object was found but could not be decoded.
    #[error("invalid object {id}: {reason}")]
    InvalidObject {
        /// The offending id.
        id: ObjectId,
        /// What was wrong.
        reason: String,
    },

    /// An object of one kind was required but another was found.
    #[error("object {id} is a {actual}, expected {expected}")]
    WrongKind {
        /// The offending id.
        id: ObjectId,
        /// What the object actually is.
        actual: ObjectKind,
        /// What the caller needed.
        expected: ObjectKind,
    },

    /// A loose-object write found the object already present.
    #[error("object {id} already exists")]
    ObjectExists {
        /// The id that was being written.
        id: ObjectId,
    },

    /// A loose-object file or its directory could not be created.
    #[error("cannot create {}: {source}", path.display())]
    CantCreateFile {
        /// The path that failed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A ref name or symbolic target failed the ref grammar.
    #[error(transparent)]
    InvalidRefName(#[from] plinth_path::RefNameError),

    /// A symbolic ref's link target does not point within `refs/`.
    #[error("symbolic ref target {target} is outside refs/")]
    InvalidLinkTarget {
        /// The rejected target.
        target: String,
    },

    /// A guarded ref update found an unexpected current target.
    #[error("ref {name}: expected old target did not match")]
    RefConflict {
        /// The ref being updated.
        name: String,
    },

    /// A ref operation addressed a ref that does not exist.
    #[error("ref {name} not found")]
    RefNotFound {
        /// The missing ref.
        name: String,
    },

    /// The repository has no working tree.
    #[error("repository is bare")]
    Bare,

    /// An object-layer error.
    #[error(transparent)]
    Object(#[from] plinth_object::ObjectError),

    /// A dir-cache error.
    #[error(transparent)]
    Index(#[from] plinth_index::IndexError),

    /// A pack-layer error.
    #[error(transparent)]
    Pack(#[from] plinth_pack::PackError),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
