//! Per-path config handles: serialization, reload, atomic rewrite.
//!
//! Each tracked path owns one [`ConfigHandle`] whose mutex serializes all
//! reads and writes against a cached parse. The cache is trusted only
//! while the file's `(mtime, size)` fingerprint is unchanged; a drifted
//! fingerprint forces a re-read before the request runs. Writes re-render
//! the whole line list into a sibling temp file and rename it into place,
//! so a reader never observes a half-written file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tracing::{debug, instrument};

use crate::error::ConfigError;
use crate::file::{AddMode, ConfigFile};
use crate::line::{ConfigEntry, EntryFilter};

/// The stat fingerprint that decides whether a cached parse is current.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Fingerprint {
    mtime: SystemTime,
    size: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        let mtime = meta.modified().ok()?;
        Some(Self { mtime, size: meta.len() })
    }
}

struct Cached {
    file: ConfigFile,
    fingerprint: Option<Fingerprint>,
}

/// A serialized view of one config file on disk.
pub struct ConfigHandle {
    path: PathBuf,
    state: Mutex<Cached>,
}

impl ConfigHandle {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(Cached { file: ConfigFile::empty(), fingerprint: None }),
        }
    }

    /// The tracked path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read entries matching `filter`, reloading first if the file changed
    /// on disk. A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Parse errors from a changed file, I/O errors from reading it.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn get_entries(&self, filter: &EntryFilter) -> Result<Vec<ConfigEntry>, ConfigError> {
        let mut state = self.lock();
        self.refresh(&mut state)?;
        Ok(state.file.get_entries(filter))
    }

    /// Apply [`ConfigFile::add_entries`] and persist the result.
    ///
    /// # Errors
    ///
    /// Everything `add_entries` returns, plus I/O from the rewrite.
    #[instrument(skip_all, fields(path = %self.path.display(), entries = entries.len()))]
    pub fn add_entries(
        &self,
        entries: Vec<ConfigEntry>,
        mode: AddMode,
    ) -> Result<(), ConfigError> {
        let mut state = self.lock();
        self.refresh(&mut state)?;
        let updated = state.file.add_entries(entries, mode)?;
        self.persist(&mut state, updated)
    }

    /// Apply [`ConfigFile::remove_entries`] and persist the result.
    ///
    /// # Errors
    ///
    /// Parse/reload errors and I/O from the rewrite.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn remove_entries(&self, filter: &EntryFilter) -> Result<(), ConfigError> {
        let mut state = self.lock();
        self.refresh(&mut state)?;
        let updated = state.file.remove_entries(filter);
        self.persist(&mut state, updated)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Cached> {
        // A poisoned lock means another request panicked mid-flight; the
        // cached parse is still consistent (mutations replace it wholesale)
        // and the next refresh re-reads the file anyway.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Re-read the file when the fingerprint no longer matches.
    fn refresh(&self, state: &mut Cached) -> Result<(), ConfigError> {
        let current = Fingerprint::of(&self.path);
        if current == state.fingerprint && current.is_some() {
            return Ok(());
        }
        match current {
            Some(_) => {
                let bytes = fs::read(&self.path)?;
                state.file = ConfigFile::parse(&bytes)?;
                debug!(lines = state.file.lines().len(), "reloaded config file");
            }
            None => {
                state.file = ConfigFile::empty();
            }
        }
        state.fingerprint = current;
        Ok(())
    }

    /// Atomically replace the file's contents and refresh the cache.
    fn persist(&self, state: &mut Cached, updated: ConfigFile) -> Result<(), ConfigError> {
        use std::io::Write;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&updated.render())?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| ConfigError::Io(e.error))?;

        state.file = updated;
        state.fingerprint = Fingerprint::of(&self.path);
        debug!("rewrote config file");
        Ok(())
    }
}

/// A caller-owned registry of config handles, keyed by canonical path.
///
/// Nothing here is global: embedders create one store and share it.
#[derive(Default)]
pub struct ConfigStore {
    handles: Mutex<HashMap<PathBuf, Arc<ConfigHandle>>>,
}

impl ConfigStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The handle for `path`, created on first use. Paths are canonicalized
    /// when possible so aliases of one file share a handle.
    #[must_use]
    pub fn handle(&self, path: &Path) -> Arc<ConfigHandle> {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut handles = self
            .handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(
            handles
                .entry(key)
                .or_insert_with(|| Arc::new(ConfigHandle::new(path.to_path_buf()))),
        )
    }
}
