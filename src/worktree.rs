//! The working-tree collaborator: its trait and the dir-cache-backed
//! implementation.
//!
//! The core exposes two tree operations to a working tree: `read_tree`
//! (flatten a tree forest into the dir cache) and `write_tree`
//! (materialize the dir cache into tree objects and store them). The
//! working tree itself owns only its index file; actual file checkout is
//! somebody else's job.

use std::path::PathBuf;
use std::sync::Mutex;

use bstr::{BString, ByteSlice};
use plinth_index::{codec, DirCache, DirCacheEntry, RemoveKey};
use plinth_object::{ObjectId, ObjectKind, Tree};
use tracing::{debug, instrument};

use crate::error::RepoError;
use crate::repo::ObjectDatabase;

/// Options for [`WorkingTree::read_tree`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadTreeOptions {
    /// Tolerate blobs referenced by the tree but absent from the object
    /// database. Subtrees must always be present — they are walked.
    pub missing_ok: bool,
}

/// Options for [`WorkingTree::write_tree`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteTreeOptions {
    /// Tolerate index entries whose blobs are absent from the object
    /// database.
    pub missing_ok: bool,
    /// Return the tree at this directory prefix instead of the root.
    pub prefix: Option<BString>,
}

/// A working tree's dir-cache surface.
pub trait WorkingTree {
    /// The current dir cache (empty when no index file exists yet).
    ///
    /// # Errors
    ///
    /// Index codec and I/O errors.
    fn dir_cache(&self) -> Result<DirCache, RepoError>;

    /// Apply removals then additions to the dir cache and persist it.
    ///
    /// # Errors
    ///
    /// Dir-cache validation and I/O errors.
    fn update_dir_cache(
        &self,
        add: Vec<DirCacheEntry>,
        remove: Vec<RemoveKey>,
    ) -> Result<(), RepoError>;

    /// Replace the dir cache with the flattened contents of a tree.
    ///
    /// # Errors
    ///
    /// [`RepoError::WrongKind`] when `id` is not a tree,
    /// [`RepoError::NotFound`] for missing objects (per
    /// [`ReadTreeOptions::missing_ok`]), and codec/I/O errors.
    fn read_tree(&self, id: &ObjectId, opts: ReadTreeOptions) -> Result<(), RepoError>;

    /// Materialize the dir cache into tree objects, store them, and
    /// return the id of the selected tree.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] for missing blobs (per
    /// [`WriteTreeOptions::missing_ok`]), unmerged-entry and
    /// prefix-not-found errors from materialization, and storage errors.
    fn write_tree(&self, opts: WriteTreeOptions) -> Result<ObjectId, RepoError>;

    /// Drop any cached dir-cache state; the next read comes from disk.
    ///
    /// # Errors
    ///
    /// None in practice; kept fallible for backends with real work here.
    fn reset_dir_cache(&self) -> Result<(), RepoError>;
}

/// A working tree backed by an index file and an object database.
pub struct FsWorkingTree<'odb> {
    odb: &'odb dyn ObjectDatabase,
    index_path: PathBuf,
    cached: Mutex<Option<DirCache>>,
}

impl<'odb> FsWorkingTree<'odb> {
    /// A working tree whose index lives at `index_path`.
    #[must_use]
    pub fn new(odb: &'odb dyn ObjectDatabase, index_path: impl Into<PathBuf>) -> Self {
        Self { odb, index_path: index_path.into(), cached: Mutex::new(None) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<DirCache>> {
        self.cached.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn load(&self) -> Result<DirCache, RepoError> {
        if self.index_path.is_file() {
            Ok(codec::read_from(&self.index_path)?)
        } else {
            Ok(DirCache::empty())
        }
    }

    fn persist(&self, cache: DirCache) -> Result<(), RepoError> {
        codec::write_to(&cache, &self.index_path)?;
        *self.lock() = Some(cache);
        Ok(())
    }
}

impl WorkingTree for FsWorkingTree<'_> {
    fn dir_cache(&self) -> Result<DirCache, RepoError> {
        let mut cached = self.lock();
        if let Some(cache) = cached.as_ref() {
            return Ok(cache.clone());
        }
        let cache = self.load()?;
        *cached = Some(cache.clone());
        Ok(cache)
    }

    #[instrument(skip_all, fields(add = add.len(), remove = remove.len()))]
    fn update_dir_cache(
        &self,
        add: Vec<DirCacheEntry>,
        remove: Vec<RemoveKey>,
    ) -> Result<(), RepoError> {
        let cache = self.dir_cache()?.remove_entries(remove)?.add_entries(add)?;
        self.persist(cache)
    }

    #[instrument(skip_all, fields(tree = %id))]
    fn read_tree(&self, id: &ObjectId, opts: ReadTreeOptions) -> Result<(), RepoError> {
        let mut entries = Vec::new();
        collect_tree(self.odb, id, &mut Vec::new(), &mut entries, opts.missing_ok)?;
        let cache = DirCache::empty().add_entries(entries)?;
        debug!(entries = cache.len(), "read tree into dir cache");
        self.persist(cache)
    }

    #[instrument(skip_all)]
    fn write_tree(&self, opts: WriteTreeOptions) -> Result<ObjectId, RepoError> {
        let cache = self.dir_cache()?;
        if !opts.missing_ok {
            for entry in cache.entries() {
                if entry.mode.is_gitlink() {
                    // Gitlink commits live in their own repository.
                    continue;
                }
                if !self.odb.contains(&entry.id) {
                    return Err(RepoError::NotFound { id: entry.id });
                }
            }
        }

        let prefix = opts.prefix.as_ref().map(|p| p.as_slice());
        let (trees, selected) = plinth_index::to_tree_objects(&cache, prefix)?;
        for tree in &trees {
            match self.odb.put_loose_object(&tree.tree.to_object()?) {
                // An identical tree already stored is success in a
                // content-addressed store.
                Ok(()) | Err(RepoError::ObjectExists { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        debug!(trees = trees.len(), root = %selected, "wrote tree objects");
        Ok(selected)
    }

    fn reset_dir_cache(&self) -> Result<(), RepoError> {
        *self.lock() = None;
        Ok(())
    }
}

/// Depth-first walk of a tree, appending one stage-0 entry per file.
fn collect_tree(
    odb: &dyn ObjectDatabase,
    id: &ObjectId,
    prefix: &mut Vec<u8>,
    out: &mut Vec<DirCacheEntry>,
    missing_ok: bool,
) -> Result<(), RepoError> {
    let object = odb.get_object(id)?;
    if object.kind() != ObjectKind::Tree {
        return Err(RepoError::WrongKind {
            id: *id,
            actual: object.kind(),
            expected: ObjectKind::Tree,
        });
    }
    let tree = Tree::parse(&object.data()?)?;
    for entry in tree.entries() {
        if entry.mode.is_tree() {
            let saved = prefix.len();
            prefix.extend_from_slice(&entry.name);
            prefix.push(b'/');
            collect_tree(odb, &entry.id, prefix, out, missing_ok)?;
            prefix.truncate(saved);
        } else {
            if !missing_ok && !entry.mode.is_gitlink() && !odb.contains(&entry.id) {
                return Err(RepoError::NotFound { id: entry.id });
            }
            let mut name = prefix.clone();
            name.extend_from_slice(&entry.name);
            out.push(DirCacheEntry::new(name.as_bstr().to_owned(), entry.mode, entry.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use plinth_object::{blob, FileMode};

    fn store_blob(repo: &MemoryRepository, content: &[u8]) -> ObjectId {
        let object = blob::from_bytes(content.to_vec()).unwrap();
        repo.put_loose_object(&object).unwrap();
        object.id()
    }

    fn worktree_entry(name: &str, id: ObjectId) -> DirCacheEntry {
        DirCacheEntry::new(name, FileMode::Regular, id)
    }

    struct Fixture {
        repo: MemoryRepository,
        _dir: tempfile::TempDir,
        index_path: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let index_path = dir.path().join("index");
        Fixture { repo: MemoryRepository::new(), _dir: dir, index_path }
    }

    #[test]
    fn empty_worktree_has_empty_cache() {
        let fx = fixture();
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        assert!(wt.dir_cache().unwrap().is_empty());
    }

    #[test]
    fn update_persists_across_instances() {
        let fx = fixture();
        let id = store_blob(&fx.repo, b"one\n");
        {
            let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
            wt.update_dir_cache(vec![worktree_entry("a.txt", id)], vec![]).unwrap();
        }
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        let cache = wt.dir_cache().unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.entries()[0].name, "a.txt");
    }

    #[test]
    fn update_removes_then_adds() {
        let fx = fixture();
        let one = store_blob(&fx.repo, b"one\n");
        let two = store_blob(&fx.repo, b"two\n");
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        wt.update_dir_cache(
            vec![worktree_entry("a", one), worktree_entry("b", one)],
            vec![],
        )
        .unwrap();
        wt.update_dir_cache(vec![worktree_entry("c", two)], vec![RemoveKey::all("a")])
            .unwrap();
        let names: Vec<_> =
            wt.dir_cache().unwrap().entries().iter().map(|e| e.name.to_string()).collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[test]
    fn write_then_read_tree_roundtrip() {
        let fx = fixture();
        let one = store_blob(&fx.repo, b"one\n");
        let two = store_blob(&fx.repo, b"two\n");
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        wt.update_dir_cache(
            vec![
                worktree_entry("dir/inner.txt", one),
                worktree_entry("top.txt", two),
            ],
            vec![],
        )
        .unwrap();

        let root = wt.write_tree(WriteTreeOptions::default()).unwrap();
        let before = wt.dir_cache().unwrap();

        // Clobber the index, then restore it from the tree.
        wt.update_dir_cache(vec![], vec![RemoveKey::all("dir/inner.txt"), RemoveKey::all("top.txt")])
            .unwrap();
        assert!(wt.dir_cache().unwrap().is_empty());
        wt.read_tree(&root, ReadTreeOptions::default()).unwrap();
        assert_eq!(wt.dir_cache().unwrap(), before);
    }

    #[test]
    fn write_tree_checks_blob_presence() {
        let fx = fixture();
        let absent = ObjectId::from_bytes([0x42; 20]);
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        wt.update_dir_cache(vec![worktree_entry("ghost", absent)], vec![]).unwrap();

        assert!(matches!(
            wt.write_tree(WriteTreeOptions::default()),
            Err(RepoError::NotFound { .. })
        ));
        let root = wt
            .write_tree(WriteTreeOptions { missing_ok: true, prefix: None })
            .unwrap();
        assert!(fx.repo.contains(&root));
    }

    #[test]
    fn write_tree_with_prefix_selects_subtree() {
        let fx = fixture();
        let id = store_blob(&fx.repo, b"x\n");
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        wt.update_dir_cache(
            vec![worktree_entry("sub/file", id), worktree_entry("other", id)],
            vec![],
        )
        .unwrap();

        let root = wt.write_tree(WriteTreeOptions::default()).unwrap();
        let sub = wt
            .write_tree(WriteTreeOptions { missing_ok: false, prefix: Some("sub".into()) })
            .unwrap();
        assert_ne!(root, sub);
        // The subtree is itself a stored tree object.
        assert_eq!(fx.repo.get_object(&sub).unwrap().kind(), ObjectKind::Tree);
    }

    #[test]
    fn read_tree_rejects_non_trees() {
        let fx = fixture();
        let blob_id = store_blob(&fx.repo, b"not a tree\n");
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        assert!(matches!(
            wt.read_tree(&blob_id, ReadTreeOptions::default()),
            Err(RepoError::WrongKind { .. })
        ));
    }

    #[test]
    fn read_tree_missing_blob_honors_missing_ok() {
        let fx = fixture();
        let present = store_blob(&fx.repo, b"here\n");
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        wt.update_dir_cache(
            vec![worktree_entry("gone", ObjectId::from_bytes([9; 20])), worktree_entry("here", present)],
            vec![],
        )
        .unwrap();
        let root = wt
            .write_tree(WriteTreeOptions { missing_ok: true, prefix: None })
            .unwrap();

        assert!(matches!(
            wt.read_tree(&root, ReadTreeOptions::default()),
            Err(RepoError::NotFound { .. })
        ));
        wt.read_tree(&root, ReadTreeOptions { missing_ok: true }).unwrap();
        assert_eq!(wt.dir_cache().unwrap().len(), 2);
    }

    #[test]
    fn reset_drops_cached_state() {
        let fx = fixture();
        let id = store_blob(&fx.repo, b"z\n");
        let wt = FsWorkingTree::new(&fx.repo, &fx.index_path);
        wt.update_dir_cache(vec![worktree_entry("z", id)], vec![]).unwrap();

        // Another instance rewrites the index behind our back.
        let other = FsWorkingTree::new(&fx.repo, &fx.index_path);
        other.update_dir_cache(vec![], vec![RemoveKey::all("z")]).unwrap();

        // Our cached copy is stale until reset.
        assert_eq!(wt.dir_cache().unwrap().len(), 1);
        wt.reset_dir_cache().unwrap();
        assert!(wt.dir_cache().unwrap().is_empty());
    }
}
