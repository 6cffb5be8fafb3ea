//! The repository boundary traits.
//!
//! [`ObjectDatabase`] is the narrow interface the plumbing consumes: read
//! an object, write a loose object, probe existence. [`Repository`] layers
//! the ref surface and the working-tree hook on top. Both traits are
//! object-safe so callers can hold `&dyn` or `Box<dyn>` backends — a
//! filesystem store, the in-memory test double, or something else
//! entirely.

use plinth_object::{Object, ObjectId};

use crate::error::RepoError;
use crate::refs::Ref;
use crate::worktree::WorkingTree;

/// Options for [`Repository::put_ref`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefPutOptions {
    /// When the ref currently stores a symbolic target, follow the link
    /// chain and update the terminal ref instead of clobbering the link.
    pub follow_link: bool,
}

/// Object storage: the two operations the core consumes, plus the
/// existence probe derived from them.
pub trait ObjectDatabase: Send + Sync {
    /// Fetch an object by id.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] or [`RepoError::InvalidObject`].
    fn get_object(&self, id: &ObjectId) -> Result<Object, RepoError>;

    /// Store an object in loose form, never clobbering.
    ///
    /// # Errors
    ///
    /// [`RepoError::ObjectExists`] when the id is already present, and
    /// [`RepoError::CantCreateFile`] when storage cannot be created.
    fn put_loose_object(&self, object: &Object) -> Result<(), RepoError>;

    /// Is this id present? The default probes via [`get_object`]
    /// (`Self::get_object`); backends with a cheaper check override it.
    fn contains(&self, id: &ObjectId) -> bool {
        self.get_object(id).is_ok()
    }
}

/// A repository: object storage plus refs and an optional working tree.
pub trait Repository: ObjectDatabase {
    /// The default working tree, or `None` for a bare repository.
    fn default_working_tree(&self) -> Option<Box<dyn WorkingTree + '_>>;

    /// Create or update a ref.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidRefName`], [`RepoError::InvalidLinkTarget`],
    /// and backend storage errors.
    fn put_ref(&self, reference: &Ref, opts: RefPutOptions) -> Result<(), RepoError>;

    /// Delete a ref, optionally only if it currently points at
    /// `old_target`.
    ///
    /// # Errors
    ///
    /// [`RepoError::RefNotFound`] and [`RepoError::RefConflict`].
    fn delete_ref(&self, name: &str, old_target: Option<ObjectId>) -> Result<(), RepoError>;
}

/// The default working tree, or [`RepoError::Bare`].
///
/// # Errors
///
/// [`RepoError::Bare`].
pub fn require_working_tree(repo: &dyn Repository) -> Result<Box<dyn WorkingTree + '_>, RepoError> {
    repo.default_working_tree().ok_or(RepoError::Bare)
}
