//! An in-memory repository: the test-double backend.
//!
//! Implements the full [`Repository`] surface over two mutex-guarded
//! maps. Useful in tests and for embedders that want git semantics
//! without a filesystem; it is always bare.

use std::collections::HashMap;
use std::sync::Mutex;

use plinth_object::{BytesContent, Object, ObjectId, ObjectKind};

use crate::error::RepoError;
use crate::refs::{Ref, RefTarget};
use crate::repo::{ObjectDatabase, RefPutOptions, Repository};
use crate::worktree::WorkingTree;

/// Symbolic-link chains longer than this are treated as broken.
const MAX_LINK_DEPTH: usize = 5;

#[derive(Default)]
struct State {
    objects: HashMap<ObjectId, (ObjectKind, Vec<u8>)>,
    refs: HashMap<String, RefTarget>,
}

/// A repository living entirely in memory.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    /// An empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// The current target of a ref, if it exists.
    #[must_use]
    pub fn ref_target(&self, name: &str) -> Option<RefTarget> {
        self.lock().refs.get(name).cloned()
    }

    /// Resolve a ref through any symbolic links to an object id.
    #[must_use]
    pub fn resolve_ref(&self, name: &str) -> Option<ObjectId> {
        let state = self.lock();
        let mut current = name.to_owned();
        for _ in 0..=MAX_LINK_DEPTH {
            match state.refs.get(&current)? {
                RefTarget::Id(id) => return Some(*id),
                RefTarget::Symbolic(next) => current = next.clone(),
            }
        }
        None
    }
}

impl ObjectDatabase for MemoryRepository {
    fn get_object(&self, id: &ObjectId) -> Result<Object, RepoError> {
        let state = self.lock();
        let (kind, bytes) =
            state.objects.get(id).ok_or(RepoError::NotFound { id: *id })?;
        Ok(Object::with_id(*kind, *id, BytesContent::new(bytes.clone())))
    }

    fn put_loose_object(&self, object: &Object) -> Result<(), RepoError> {
        let id = object.id();
        let mut state = self.lock();
        if state.objects.contains_key(&id) {
            return Err(RepoError::ObjectExists { id });
        }
        let bytes = object.data()?;
        state.objects.insert(id, (object.kind(), bytes));
        Ok(())
    }

    fn contains(&self, id: &ObjectId) -> bool {
        self.lock().objects.contains_key(id)
    }
}

impl Repository for MemoryRepository {
    fn default_working_tree(&self) -> Option<Box<dyn WorkingTree + '_>> {
        // Memory repositories are always bare.
        None
    }

    fn put_ref(&self, reference: &Ref, opts: RefPutOptions) -> Result<(), RepoError> {
        let mut state = self.lock();
        let mut name = reference.name().to_owned();
        if opts.follow_link {
            let mut depth = 0;
            while let Some(RefTarget::Symbolic(next)) = state.refs.get(&name) {
                name = next.clone();
                depth += 1;
                if depth > MAX_LINK_DEPTH {
                    return Err(RepoError::RefConflict { name });
                }
            }
        }
        state.refs.insert(name, reference.target().clone());
        Ok(())
    }

    fn delete_ref(&self, name: &str, old_target: Option<ObjectId>) -> Result<(), RepoError> {
        let mut state = self.lock();
        let current = state
            .refs
            .get(name)
            .ok_or_else(|| RepoError::RefNotFound { name: name.to_owned() })?;
        if let Some(expected) = old_target {
            if current != &RefTarget::Id(expected) {
                return Err(RepoError::RefConflict { name: name.to_owned() });
            }
        }
        state.refs.remove(name);
        Ok(())
    }
}
