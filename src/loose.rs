//! The loose-object store: `objects/<2>/<38>` zlib files.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use plinth_object::{loose, BytesContent, Object, ObjectId};
use tracing::{debug, instrument};

use crate::error::RepoError;

/// A loose-object directory.
///
/// Each object lives at `<objects_dir>/<first 2 hex>/<remaining 38>`,
/// holding `"{kind} {size}\0{content}"` deflated. Writes are
/// create-or-fail: an existing object is never clobbered.
#[derive(Clone, Debug)]
pub struct LooseStore {
    objects_dir: PathBuf,
}

impl LooseStore {
    /// A store rooted at `objects_dir` (typically `<git_dir>/objects`).
    #[must_use]
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self { objects_dir: objects_dir.into() }
    }

    /// The path an id maps to.
    #[must_use]
    pub fn path_for(&self, id: &ObjectId) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    /// Is this id stored loose?
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.path_for(id).is_file()
    }

    /// Read and inflate a loose object.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when no file exists,
    /// [`RepoError::InvalidObject`] when it does not inflate to a
    /// well-formed `"{kind} {size}\0"` stream.
    #[instrument(skip_all, fields(id = %id))]
    pub fn get(&self, id: &ObjectId) -> Result<Object, RepoError> {
        let path = self.path_for(id);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(RepoError::NotFound { id: *id });
            }
            Err(err) => return Err(RepoError::Io(err)),
        };

        let bad = |reason: String| RepoError::InvalidObject { id: *id, reason };
        let mut inflated = Vec::new();
        ZlibDecoder::new(file)
            .read_to_end(&mut inflated)
            .map_err(|e| bad(format!("corrupt deflate stream: {e}")))?;

        let (kind, size, header_len) =
            loose::decode_header(&inflated).map_err(|e| bad(e.to_string()))?;
        let content = inflated.split_off(header_len);
        if content.len() as u64 != size {
            return Err(bad(format!(
                "header declares {size} bytes, found {}",
                content.len()
            )));
        }
        debug!(kind = %kind, size, "read loose object");
        Ok(Object::with_id(kind, *id, BytesContent::new(content)))
    }

    /// Deflate an object into the store, streaming its content.
    ///
    /// The bytes land in a temp file first and are renamed into place
    /// without clobbering, so a concurrent writer of the same object
    /// cannot corrupt it and an existing object reports
    /// [`RepoError::ObjectExists`].
    ///
    /// # Errors
    ///
    /// [`RepoError::ObjectExists`], [`RepoError::CantCreateFile`], and
    /// content-source I/O.
    #[instrument(skip_all, fields(id = %object.id(), kind = %object.kind()))]
    pub fn put(&self, object: &Object) -> Result<(), RepoError> {
        let id = object.id();
        let target = self.path_for(&id);
        if target.is_file() {
            return Err(RepoError::ObjectExists { id });
        }

        let fan_dir = target.parent().unwrap_or(&self.objects_dir);
        fs::create_dir_all(fan_dir).map_err(|source| RepoError::CantCreateFile {
            path: fan_dir.to_path_buf(),
            source,
        })?;

        let temp = tempfile::NamedTempFile::new_in(fan_dir).map_err(|source| {
            RepoError::CantCreateFile { path: fan_dir.to_path_buf(), source }
        })?;
        let mut encoder = ZlibEncoder::new(temp, Compression::default());
        encoder.write_all(&loose::encode_header(object.kind(), object.size()))?;
        io::copy(&mut object.content().open()?, &mut encoder)?;
        let temp = encoder.finish()?;

        match temp.persist_noclobber(&target) {
            Ok(_) => {
                debug!(path = %target.display(), "wrote loose object");
                Ok(())
            }
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                // Lost a race to an identical writer; the object is there.
                Err(RepoError::ObjectExists { id })
            }
            Err(err) => Err(RepoError::CantCreateFile { path: target, source: err.error }),
        }
    }
}
