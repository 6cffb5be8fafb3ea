//! Tree objects: ordered directory snapshots.

use std::cmp::Ordering;
use std::io;

use bstr::{BString, ByteSlice};
use plinth_path::{check_path_segment, compare_same_name, compare_tree_names, PathPlatforms};

use crate::content::BytesContent;
use crate::error::ObjectError;
use crate::id::ObjectId;
use crate::kind::ObjectKind;
use crate::mode::FileMode;
use crate::object::Object;

/// One entry of a tree: a name, a mode, and the id of the named object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// Entry name (a single path segment, raw bytes).
    pub name: BString,
    /// The entry mode.
    pub mode: FileMode,
    /// Id of the blob, tree, or commit this entry points to.
    pub id: ObjectId,
}

impl TreeEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(name: impl Into<BString>, mode: FileMode, id: ObjectId) -> Self {
        Self { name: name.into(), mode, id }
    }

    /// Whether this entry's name compares with an implicit trailing `/`.
    #[must_use]
    pub const fn sorts_as_tree(&self) -> bool {
        self.mode.sorts_as_tree()
    }

    /// The tree-sort ordering between two entries.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        compare_tree_names(&self.name, self.sorts_as_tree(), &other.name, other.sorts_as_tree())
    }
}

/// A tree object: a validated, ordered sequence of entries.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// Build a tree from entries already in tree-sort order.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidTree`] on misordered or colliding entries,
    /// [`ObjectError::InvalidName`] on a bad entry name, and
    /// [`ObjectError::InvalidObjectId`] on a zero entry id.
    pub fn new(entries: Vec<TreeEntry>) -> Result<Self, ObjectError> {
        let tree = Self { entries };
        tree.validate()?;
        Ok(tree)
    }

    /// Build a tree from entries in any order.
    ///
    /// # Errors
    ///
    /// As [`Tree::new`], except misordering is repaired rather than
    /// rejected.
    pub fn from_unsorted(mut entries: Vec<TreeEntry>) -> Result<Self, ObjectError> {
        entries.sort_by(TreeEntry::compare);
        Self::new(entries)
    }

    /// The entries, in tree-sort order.
    #[must_use]
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Look up an entry by exact name.
    #[must_use]
    pub fn entry(&self, name: &[u8]) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn validate(&self) -> Result<(), ObjectError> {
        for entry in &self.entries {
            check_path_segment(&entry.name, PathPlatforms::NONE)?;
            if entry.id.is_zero() {
                return Err(ObjectError::InvalidObjectId {
                    value: entry.id.to_hex().into(),
                    reason: format!("zero id for tree entry {:?}", entry.name),
                });
            }
        }
        for pair in self.entries.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if compare_same_name(&prev.name, &next.name, next.sorts_as_tree()) == Ordering::Equal {
                return Err(ObjectError::InvalidTree {
                    reason: format!("duplicate entry name {:?}", next.name),
                });
            }
            if prev.compare(next) != Ordering::Less {
                return Err(ObjectError::InvalidTree {
                    reason: format!("entries out of order near {:?}", next.name),
                });
            }
        }
        Ok(())
    }

    /// Canonical serialization: `{mode} {name}\0{20 raw id bytes}` per
    /// entry, concatenated.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.as_octal_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.id.as_bytes());
        }
        out
    }

    /// Parse a canonical tree serialization and validate the result.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidTree`] on framing problems (missing NUL,
    /// truncated id, empty name), [`ObjectError::InvalidMode`] on a bad
    /// mode field, plus everything [`Tree::new`] rejects.
    pub fn parse(bytes: &[u8]) -> Result<Self, ObjectError> {
        let entries = TreeIter::new(bytes)
            .map(|entry| entry.map(TreeEntryRef::to_owned))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries)
    }

    /// Iterate a serialized tree without building a [`Tree`]. Framing is
    /// checked per entry; sort order is not (that is [`Tree::parse`]'s
    /// job).
    #[must_use]
    pub fn iter_bytes(bytes: &[u8]) -> TreeIter<'_> {
        TreeIter::new(bytes)
    }

    /// Wrap the serialization into an [`Object`], computing its id.
    ///
    /// # Errors
    ///
    /// I/O errors from hashing (none in practice for in-memory content).
    pub fn to_object(&self) -> io::Result<Object> {
        Object::new(ObjectKind::Tree, BytesContent::new(self.serialize()))
    }
}

/// A borrowed view of one serialized tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeEntryRef<'a> {
    /// Entry name, borrowed from the serialization.
    pub name: &'a bstr::BStr,
    /// The entry mode.
    pub mode: FileMode,
    /// Id of the named object.
    pub id: ObjectId,
}

impl TreeEntryRef<'_> {
    /// Copy into an owned [`TreeEntry`].
    #[must_use]
    pub fn to_owned(self) -> TreeEntry {
        TreeEntry { name: self.name.to_owned(), mode: self.mode, id: self.id }
    }
}

/// Streaming decoder over a serialized tree's bytes.
///
/// Yields entries until the input is exhausted; a framing error ends the
/// iteration after the error item.
pub struct TreeIter<'a> {
    rest: &'a [u8],
    failed: bool,
}

impl<'a> TreeIter<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { rest: bytes, failed: false }
    }

    fn next_entry(&mut self) -> Result<TreeEntryRef<'a>, ObjectError> {
        // Work on a copy of the slice reference so the yielded name
        // borrows the input, not this iterator.
        let mut rest: &'a [u8] = self.rest;

        let space = rest.find_byte(b' ').ok_or_else(|| ObjectError::InvalidTree {
            reason: "truncated entry: no space after mode".to_owned(),
        })?;
        let mode = FileMode::from_octal_bytes(&rest[..space])?;
        rest = &rest[space + 1..];

        let nul = rest.find_byte(0).ok_or_else(|| ObjectError::InvalidTree {
            reason: "truncated entry: name not NUL-terminated".to_owned(),
        })?;
        if nul == 0 {
            return Err(ObjectError::InvalidTree { reason: "empty entry name".to_owned() });
        }
        let name = rest[..nul].as_bstr();
        rest = &rest[nul + 1..];

        if rest.len() < 20 {
            return Err(ObjectError::InvalidTree {
                reason: format!("truncated object id for entry {name:?}"),
            });
        }
        let id = ObjectId::try_from_bytes(&rest[..20])?;
        self.rest = &rest[20..];

        Ok(TreeEntryRef { name, mode, id })
    }
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = Result<TreeEntryRef<'a>, ObjectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.rest.is_empty() {
            return None;
        }
        let entry = self.next_entry();
        if entry.is_err() {
            self.failed = true;
        }
        Some(entry)
    }
}
