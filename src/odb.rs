//! The filesystem object database: loose objects plus pack fallback.

use std::fs;
use std::path::{Path, PathBuf};

use plinth_object::{Object, ObjectId};
use plinth_pack::{PackError, PackReader};
use tracing::{debug, instrument};

use crate::error::RepoError;
use crate::loose::LooseStore;
use crate::repo::ObjectDatabase;

/// Object storage under a `.git`-style directory.
///
/// Reads try the loose store first, then every `objects/pack/*.idx` /
/// `*.pack` pair. Pack readers are opened per lookup and dropped after —
/// no handle or mmap survives a call, matching the loose store's
/// stateless behavior.
#[derive(Clone, Debug)]
pub struct FsObjectDatabase {
    git_dir: PathBuf,
    loose: LooseStore,
}

impl FsObjectDatabase {
    /// Open the database under `git_dir` (the directory holding
    /// `objects/`).
    #[must_use]
    pub fn open(git_dir: impl Into<PathBuf>) -> Self {
        let git_dir = git_dir.into();
        let loose = LooseStore::new(git_dir.join("objects"));
        Self { git_dir, loose }
    }

    /// The repository directory this database lives under.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// The loose half of the store.
    #[must_use]
    pub const fn loose(&self) -> &LooseStore {
        &self.loose
    }

    /// Every `(pack, idx)` pair under `objects/pack/`.
    fn pack_pairs(&self) -> Vec<(PathBuf, PathBuf)> {
        let pack_dir = self.git_dir.join("objects").join("pack");
        let Ok(listing) = fs::read_dir(pack_dir) else {
            return Vec::new();
        };
        let mut pairs: Vec<(PathBuf, PathBuf)> = listing
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|e| e == "idx"))
            .filter_map(|idx| {
                let pack = idx.with_extension("pack");
                pack.is_file().then_some((pack, idx))
            })
            .collect();
        pairs.sort();
        pairs
    }

    fn get_from_packs(&self, id: &ObjectId) -> Result<Option<Object>, RepoError> {
        for (pack_path, idx_path) in self.pack_pairs() {
            let reader = PackReader::open(&pack_path, &idx_path)?;
            match reader.get_object(id) {
                Ok(object) => {
                    debug!(pack = %pack_path.display(), "found object in pack");
                    return Ok(Some(object));
                }
                Err(PackError::NotFound { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }
}

impl ObjectDatabase for FsObjectDatabase {
    #[instrument(skip_all, fields(id = %id))]
    fn get_object(&self, id: &ObjectId) -> Result<Object, RepoError> {
        match self.loose.get(id) {
            Ok(object) => Ok(object),
            Err(RepoError::NotFound { .. }) => self
                .get_from_packs(id)?
                .ok_or(RepoError::NotFound { id: *id }),
            Err(err) => Err(err),
        }
    }

    fn put_loose_object(&self, object: &Object) -> Result<(), RepoError> {
        self.loose.put(object)
    }

    fn contains(&self, id: &ObjectId) -> bool {
        if self.loose.contains(id) {
            return true;
        }
        self.pack_pairs().iter().any(|(pack, idx)| {
            PackReader::open(pack, idx).is_ok_and(|reader| reader.has_object(id))
        })
    }
}
