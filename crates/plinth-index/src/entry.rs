//! A single directory-cache entry.

use std::cmp::Ordering;

use bstr::BString;
use plinth_object::{FileMode, ObjectId};
use plinth_path::{check_path, PathPlatforms};

use crate::error::IndexError;

/// Bit 15 of the flags word: the "assume unchanged" marker.
pub(crate) const FLAG_ASSUME_VALID: u16 = 0x8000;
/// Bit 14 of the flags word: version-3 extended flags follow.
pub(crate) const FLAG_EXTENDED: u16 = 0x4000;
/// Bits 12–13: the merge stage.
pub(crate) const STAGE_SHIFT: u16 = 12;
/// Bits 0–11: the stored name length, saturating at 0xFFF.
pub(crate) const NAME_LENGTH_MASK: u16 = 0x0FFF;

/// One entry of the directory cache.
///
/// Carries the cached stat fingerprint alongside the object identity so a
/// working-tree walker can detect modification without re-hashing. The
/// three version-3 flags (`extended`, `skip_worktree`, `intent_to_add`)
/// exist in the model but must be false for a cache that claims version 2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirCacheEntry {
    /// Full path, raw bytes, `/`-separated.
    pub name: BString,
    /// Merge stage, 0..=3. Stage 0 is fully merged.
    pub stage: u8,
    /// The blob (or gitlink commit) id.
    pub id: ObjectId,
    /// File mode. Tree mode is not storable in the index.
    pub mode: FileMode,
    /// Cached file size, truncated to 32 bits.
    pub size: u32,
    /// Change-time seconds.
    pub ctime_s: u32,
    /// Change-time nanoseconds.
    pub ctime_ns: u32,
    /// Modification-time seconds.
    pub mtime_s: u32,
    /// Modification-time nanoseconds.
    pub mtime_ns: u32,
    /// Device number.
    pub dev: u32,
    /// Inode number.
    pub ino: u32,
    /// Owner uid.
    pub uid: u32,
    /// Owner gid.
    pub gid: u32,
    /// Skip worktree comparison for this entry.
    pub assume_valid: bool,
    /// Version-3 extended flags word present (must be false in v2).
    pub extended: bool,
    /// Sparse-checkout skip marker (v3; must be false in v2).
    pub skip_worktree: bool,
    /// `git add -N` marker (v3; must be false in v2).
    pub intent_to_add: bool,
}

impl DirCacheEntry {
    /// A stage-0 entry with zeroed stat fields.
    #[must_use]
    pub fn new(name: impl Into<BString>, mode: FileMode, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            stage: 0,
            id,
            mode,
            size: 0,
            ctime_s: 0,
            ctime_ns: 0,
            mtime_s: 0,
            mtime_ns: 0,
            dev: 0,
            ino: 0,
            uid: 0,
            gid: 0,
            assume_valid: false,
            extended: false,
            skip_worktree: false,
            intent_to_add: false,
        }
    }

    /// The same entry at a different merge stage.
    #[must_use]
    pub fn with_stage(mut self, stage: u8) -> Self {
        self.stage = stage;
        self
    }

    /// Total order over `(name, stage)`.
    #[must_use]
    pub fn key_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name).then(self.stage.cmp(&other.stage))
    }

    /// True when `other` addresses the same `(name, stage)` slot.
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }

    /// Validate this entry in isolation.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidEntry`] on a bad stage, a tree mode, or a zero
    /// id; [`IndexError::Path`] on a name that fails path validation.
    pub fn validate(&self) -> Result<(), IndexError> {
        check_path(&self.name, PathPlatforms::NONE)?;
        let invalid = |reason: &str| IndexError::InvalidEntry {
            name: self.name.clone(),
            reason: reason.to_owned(),
        };
        if self.stage > 3 {
            return Err(invalid("stage out of range"));
        }
        if self.mode == FileMode::Tree {
            return Err(invalid("tree mode is not storable in the index"));
        }
        if self.id.is_zero() {
            return Err(invalid("zero object id"));
        }
        Ok(())
    }

    /// The packed 16-bit flags word of the v2 layout.
    #[must_use]
    pub fn flags_word(&self) -> u16 {
        let mut flags = u16::try_from(self.name.len())
            .unwrap_or(NAME_LENGTH_MASK)
            .min(NAME_LENGTH_MASK);
        flags |= u16::from(self.stage) << STAGE_SHIFT;
        if self.assume_valid {
            flags |= FLAG_ASSUME_VALID;
        }
        if self.extended {
            flags |= FLAG_EXTENDED;
        }
        flags
    }
}
