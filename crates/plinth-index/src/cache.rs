//! The directory cache value and its pure mutation operations.

use std::cmp::Ordering;

use bstr::{BString, ByteSlice};

use crate::entry::DirCacheEntry;
use crate::error::IndexError;

/// The only index version this library reads or writes.
pub const VERSION: u32 = 2;

/// How a [`RemoveKey`] selects stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageSelector {
    /// Remove only the entry at this stage.
    Exact(u8),
    /// Remove every stage of the name.
    All,
}

/// One removal request: a path and which of its stages to drop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveKey {
    /// The path to remove.
    pub name: BString,
    /// Which stages to drop.
    pub stages: StageSelector,
}

impl RemoveKey {
    /// Remove every stage of `name`.
    #[must_use]
    pub fn all(name: impl Into<BString>) -> Self {
        Self { name: name.into(), stages: StageSelector::All }
    }

    /// Remove only `stage` of `name`.
    #[must_use]
    pub fn stage(name: impl Into<BString>, stage: u8) -> Self {
        Self { name: name.into(), stages: StageSelector::Exact(stage) }
    }

    fn matches(&self, entry: &DirCacheEntry) -> bool {
        self.name == entry.name
            && match self.stages {
                StageSelector::All => true,
                StageSelector::Exact(stage) => stage == entry.stage,
            }
    }
}

/// The directory cache: a version tag and a strictly sorted entry vector.
///
/// A `DirCache` is a pure value — [`add_entries`](Self::add_entries) and
/// [`remove_entries`](Self::remove_entries) return new caches and never
/// touch the receiver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirCache {
    version: u32,
    entries: Vec<DirCacheEntry>,
}

impl Default for DirCache {
    fn default() -> Self {
        Self::empty()
    }
}

impl DirCache {
    /// The empty version-2 cache.
    #[must_use]
    pub const fn empty() -> Self {
        Self { version: VERSION, entries: Vec::new() }
    }

    /// Assemble a cache from parts. Used by the codec; validates nothing.
    #[must_use]
    pub(crate) const fn from_parts(version: u32, entries: Vec<DirCacheEntry>) -> Self {
        Self { version, entries }
    }

    /// The format version (always 2 for a valid cache).
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// The entries, sorted by `(name, stage)`.
    #[must_use]
    pub fn entries(&self) -> &[DirCacheEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry at `(name, stage)`.
    #[must_use]
    pub fn entry(&self, name: &[u8], stage: u8) -> Option<&DirCacheEntry> {
        self.entries
            .binary_search_by(|e| {
                e.name.as_slice().cmp(name).then(e.stage.cmp(&stage))
            })
            .ok()
            .map(|i| &self.entries[i])
    }

    /// True iff every entry is at stage 0.
    #[must_use]
    pub fn fully_merged(&self) -> bool {
        self.entries.iter().all(|e| e.stage == 0)
    }

    /// Enforce the cache invariants.
    ///
    /// Entries must be individually valid, strictly ascending under
    /// `(name, stage)`, and no entry's name may be a directory prefix of
    /// another entry's name. Version-3 flags must be clear, since this is
    /// a version-2 cache.
    ///
    /// # Errors
    ///
    /// [`IndexError::UnsupportedVersion`], [`IndexError::InvalidEntry`],
    /// [`IndexError::DuplicateEntries`], or
    /// [`IndexError::InvalidDirCache`].
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.version != VERSION {
            return Err(IndexError::UnsupportedVersion { version: self.version });
        }
        for entry in &self.entries {
            entry.validate()?;
            if entry.extended || entry.skip_worktree || entry.intent_to_add {
                return Err(IndexError::InvalidEntry {
                    name: entry.name.clone(),
                    reason: "version-3 flags set in a version-2 cache".to_owned(),
                });
            }
        }
        for pair in self.entries.windows(2) {
            match pair[0].key_cmp(&pair[1]) {
                Ordering::Less => {}
                Ordering::Equal => {
                    return Err(IndexError::DuplicateEntries {
                        name: pair[1].name.clone(),
                        stage: pair[1].stage,
                    });
                }
                Ordering::Greater => {
                    return Err(IndexError::InvalidDirCache {
                        reason: format!("entries out of order near {:?}", pair[1].name),
                    });
                }
            }
        }
        self.check_prefix_conflicts()
    }

    /// A file `a` and a file `a/b` cannot coexist: every proper directory
    /// prefix of each name must be absent from the entry list.
    fn check_prefix_conflicts(&self) -> Result<(), IndexError> {
        for entry in &self.entries {
            let name = entry.name.as_slice();
            for slash in name.find_iter(b"/") {
                let prefix = &name[..slash];
                if self.has_name(prefix) {
                    return Err(IndexError::InvalidDirCache {
                        reason: format!(
                            "{:?} conflicts with directory prefix of {:?}",
                            prefix.as_bstr(),
                            entry.name
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn has_name(&self, name: &[u8]) -> bool {
        self.entries
            .binary_search_by(|e| {
                e.name.as_slice().cmp(name).then(Ordering::Greater)
            })
            .err()
            .is_some_and(|i| self.entries.get(i).is_some_and(|e| e.name == name))
    }

    /// Merge `new` entries into this cache, producing a new cache.
    ///
    /// `new` entries must be individually valid and carry no duplicate
    /// `(name, stage)` keys among themselves; this cache must be valid. An
    /// incoming entry whose key already exists replaces the old entry. The
    /// merge is a linear two-pointer walk over the two sorted sequences.
    ///
    /// # Errors
    ///
    /// [`IndexError::DuplicateEntries`] on duplicate keys within `new`,
    /// any per-entry validation error, and
    /// [`IndexError::InvalidDirCache`] when the merged result would
    /// violate the directory-prefix rule.
    pub fn add_entries(&self, new: Vec<DirCacheEntry>) -> Result<Self, IndexError> {
        self.validate()?;
        let mut incoming = new;
        for entry in &incoming {
            entry.validate()?;
        }
        incoming.sort_by(DirCacheEntry::key_cmp);
        for pair in incoming.windows(2) {
            if pair[0].same_key(&pair[1]) {
                return Err(IndexError::DuplicateEntries {
                    name: pair[1].name.clone(),
                    stage: pair[1].stage,
                });
            }
        }

        let mut merged = Vec::with_capacity(self.entries.len() + incoming.len());
        let mut old_iter = self.entries.iter().cloned().peekable();
        let mut new_iter = incoming.into_iter().peekable();
        loop {
            let take_old = match (old_iter.peek(), new_iter.peek()) {
                (Some(old), Some(new)) => match old.key_cmp(new) {
                    Ordering::Less => true,
                    Ordering::Greater => false,
                    Ordering::Equal => {
                        // Replacement: the incoming entry wins.
                        old_iter.next();
                        false
                    }
                },
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_old { old_iter.next() } else { new_iter.next() };
            merged.extend(next);
        }

        let cache = Self { version: self.version, entries: merged };
        cache.validate()?;
        Ok(cache)
    }

    /// Remove entries, producing a new cache.
    ///
    /// The removal list is sorted internally; removal itself is a single
    /// linear pass. Removing a name that is not present is a no-op.
    ///
    /// # Errors
    ///
    /// Validation errors from this cache.
    pub fn remove_entries(&self, remove: Vec<RemoveKey>) -> Result<Self, IndexError> {
        self.validate()?;
        let mut keys = remove;
        keys.sort_by(|a, b| a.name.cmp(&b.name));

        let mut kept = Vec::with_capacity(self.entries.len());
        let mut key_idx = 0;
        for entry in &self.entries {
            while key_idx < keys.len() && keys[key_idx].name.as_slice() < entry.name.as_slice() {
                key_idx += 1;
            }
            let dropped = keys[key_idx..]
                .iter()
                .take_while(|k| k.name == entry.name)
                .any(|k| k.matches(entry));
            if !dropped {
                kept.push(entry.clone());
            }
        }
        Ok(Self { version: self.version, entries: kept })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_object::{FileMode, ObjectId};

    fn id(fill: u8) -> ObjectId {
        ObjectId::from_bytes([fill; 20])
    }

    fn entry(name: &str) -> DirCacheEntry {
        DirCacheEntry::new(name, FileMode::Regular, id(1))
    }

    fn cache(names: &[&str]) -> DirCache {
        DirCache::empty()
            .add_entries(names.iter().map(|n| entry(n)).collect())
            .unwrap()
    }

    // -- validation --

    #[test]
    fn empty_cache_is_valid() {
        DirCache::empty().validate().unwrap();
        assert!(DirCache::empty().fully_merged());
        assert!(DirCache::empty().is_empty());
    }

    #[test]
    fn detects_out_of_order_entries() {
        let cache = DirCache::from_parts(VERSION, vec![entry("b"), entry("a")]);
        assert!(matches!(cache.validate(), Err(IndexError::InvalidDirCache { .. })));
    }

    #[test]
    fn detects_duplicate_keys() {
        let cache = DirCache::from_parts(VERSION, vec![entry("a"), entry("a")]);
        assert!(matches!(cache.validate(), Err(IndexError::DuplicateEntries { .. })));
    }

    #[test]
    fn different_stages_of_a_name_are_distinct() {
        let cache = DirCache::from_parts(
            VERSION,
            vec![entry("a").with_stage(1), entry("a").with_stage(2)],
        );
        cache.validate().unwrap();
        assert!(!cache.fully_merged());
    }

    #[test]
    fn detects_directory_prefix_conflicts() {
        let cache = DirCache::from_parts(VERSION, vec![entry("a"), entry("a/b")]);
        assert!(matches!(cache.validate(), Err(IndexError::InvalidDirCache { .. })));
        // "a.txt" is not a prefix conflict with "a/b".
        cache_ok(&["a.txt", "a/b"]);
        // Nested case: "a/b" vs "a/b/c".
        let cache = DirCache::from_parts(VERSION, vec![entry("a/b"), entry("a/b/c")]);
        assert!(cache.validate().is_err());
    }

    fn cache_ok(names: &[&str]) {
        cache(names).validate().unwrap();
    }

    #[test]
    fn rejects_wrong_version() {
        let cache = DirCache::from_parts(3, vec![]);
        assert!(matches!(
            cache.validate(),
            Err(IndexError::UnsupportedVersion { version: 3 })
        ));
    }

    #[test]
    fn rejects_v3_flags() {
        let mut e = entry("a");
        e.skip_worktree = true;
        let cache = DirCache::from_parts(VERSION, vec![e]);
        assert!(matches!(cache.validate(), Err(IndexError::InvalidEntry { .. })));
    }

    // -- queries --

    #[test]
    fn entry_lookup_by_name_and_stage() {
        let c = cache(&["a", "b", "c"]);
        assert!(c.entry(b"b", 0).is_some());
        assert!(c.entry(b"b", 1).is_none());
        assert!(c.entry(b"missing", 0).is_none());
    }

    // -- add --

    #[test]
    fn add_merges_sorted() {
        let c = cache(&["b", "d"]);
        let merged = c.add_entries(vec![entry("a"), entry("c"), entry("e")]).unwrap();
        let names: Vec<_> = merged.entries().iter().map(|e| e.name.to_string()).collect();
        assert_eq!(names, ["a", "b", "c", "d", "e"]);
        // The receiver is untouched.
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn add_replaces_same_key() {
        let c = cache(&["a"]);
        let replacement = DirCacheEntry::new("a", FileMode::Executable, id(9));
        let merged = c.add_entries(vec![replacement]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.entries()[0].mode, FileMode::Executable);
        assert_eq!(merged.entries()[0].id, id(9));
    }

    #[test]
    fn add_rejects_duplicates_in_input() {
        let c = DirCache::empty();
        assert!(matches!(
            c.add_entries(vec![entry("a"), entry("a")]),
            Err(IndexError::DuplicateEntries { .. })
        ));
    }

    #[test]
    fn add_rejects_resulting_prefix_conflict() {
        let c = cache(&["a"]);
        assert!(c.add_entries(vec![entry("a/b")]).is_err());
    }

    #[test]
    fn add_nothing_is_identity() {
        let c = cache(&["a", "b"]);
        assert_eq!(c.add_entries(vec![]).unwrap(), c);
    }

    // -- remove --

    #[test]
    fn remove_by_name_all_stages() {
        let c = DirCache::empty()
            .add_entries(vec![
                entry("a").with_stage(1),
                entry("a").with_stage(2),
                entry("b"),
            ])
            .unwrap();
        let removed = c.remove_entries(vec![RemoveKey::all("a")]).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed.entries()[0].name, "b");
    }

    #[test]
    fn remove_by_exact_stage() {
        let c = DirCache::empty()
            .add_entries(vec![entry("a").with_stage(1), entry("a").with_stage(2)])
            .unwrap();
        let removed = c.remove_entries(vec![RemoveKey::stage("a", 1)]).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed.entries()[0].stage, 2);
    }

    #[test]
    fn remove_missing_is_noop_and_empty_is_identity() {
        let c = cache(&["a", "b"]);
        assert_eq!(c.remove_entries(vec![RemoveKey::all("zzz")]).unwrap(), c);
        assert_eq!(c.remove_entries(vec![]).unwrap(), c);
    }

    #[test]
    fn remove_several_names_in_one_pass() {
        let c = cache(&["a", "b", "c", "d"]);
        let removed = c
            .remove_entries(vec![RemoveKey::all("d"), RemoveKey::all("b")])
            .unwrap();
        let names: Vec<_> = removed.entries().iter().map(|e| e.name.to_string()).collect();
        assert_eq!(names, ["a", "c"]);
    }
}
