//! Materializing a directory cache into a forest of tree objects.
//!
//! The cache's flat, sorted path list already visits directories in tree
//! order, so one forward walk with recursion at each `/` boundary builds
//! every (sub)tree without re-sorting.

use bstr::{BString, ByteSlice};
use plinth_object::{FileMode, ObjectId, Tree, TreeEntry};

use crate::cache::DirCache;
use crate::entry::DirCacheEntry;
use crate::error::IndexError;

/// One materialized tree, keyed by the directory prefix it snapshots
/// (empty for the root).
#[derive(Clone, Debug)]
pub struct TreeForPrefix {
    /// Directory path of this tree, no trailing slash; empty at the root.
    pub prefix: BString,
    /// The tree value.
    pub tree: Tree,
    /// The tree's object id.
    pub id: ObjectId,
}

/// Build every tree object implied by the cache.
///
/// Returns the distinct trees sorted by prefix, plus the id of the tree
/// selected by `prefix` (the root when `None`).
///
/// # Errors
///
/// Validation errors from the cache, [`IndexError::UnmergedEntry`] when a
/// non-zero stage is present, and [`IndexError::PrefixNotFound`] when
/// `prefix` names no directory in the cache.
pub fn to_tree_objects(
    cache: &DirCache,
    prefix: Option<&[u8]>,
) -> Result<(Vec<TreeForPrefix>, ObjectId), IndexError> {
    cache.validate()?;

    let mut trees = Vec::new();
    let (consumed, _) = build_subtree(cache.entries(), 0, b"", &mut trees)?;
    debug_assert_eq!(consumed, cache.len());

    trees.sort_by(|a, b| a.prefix.cmp(&b.prefix));

    let wanted = prefix.unwrap_or(b"");
    let wanted = wanted.strip_suffix(b"/").unwrap_or(wanted);
    let selected = trees
        .iter()
        .find(|t| t.prefix == wanted)
        .map(|t| t.id)
        .ok_or_else(|| IndexError::PrefixNotFound { prefix: wanted.into() })?;

    Ok((trees, selected))
}

/// Build the tree for `dir_prefix` (which is either empty or ends in `/`)
/// from the contiguous run of entries starting at `start`. Returns the
/// index just past the run and the new tree's id.
fn build_subtree(
    entries: &[DirCacheEntry],
    start: usize,
    dir_prefix: &[u8],
    out: &mut Vec<TreeForPrefix>,
) -> Result<(usize, ObjectId), IndexError> {
    let mut tree_entries = Vec::new();
    let mut i = start;
    while i < entries.len() && entries[i].name.starts_with(dir_prefix) {
        let entry = &entries[i];
        let rest = &entry.name[dir_prefix.len()..];
        if let Some(slash) = rest.find_byte(b'/') {
            let child_name = rest[..slash].as_bstr().to_owned();
            let child_prefix = &entry.name[..dir_prefix.len() + slash + 1];
            let (next, child_id) = build_subtree(entries, i, child_prefix, out)?;
            tree_entries.push(TreeEntry::new(child_name, FileMode::Tree, child_id));
            i = next;
        } else {
            if entry.stage != 0 {
                return Err(IndexError::UnmergedEntry { name: entry.name.clone() });
            }
            tree_entries.push(TreeEntry::new(rest.as_bstr().to_owned(), entry.mode, entry.id));
            i += 1;
        }
    }

    let tree = Tree::new(tree_entries)?;
    let id = tree.to_object()?.id();
    let prefix = dir_prefix.strip_suffix(b"/").unwrap_or(dir_prefix);
    out.push(TreeForPrefix { prefix: prefix.into(), tree, id });
    Ok((i, id))
}
