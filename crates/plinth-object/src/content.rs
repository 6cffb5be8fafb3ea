//! Content sources: lazy byte streams with a known length.
//!
//! An object's content is reached through the [`ContentSource`] capability
//! trait rather than a `Vec<u8>`, so a multi-gigabyte blob can be hashed
//! and written without ever being resident. The file-backed source is
//! restartable — `open` can be called repeatedly — which is what allows
//! one pass to compute the SHA-1 and a second pass to write the bytes.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;

/// A finite byte stream with its length known up front.
pub trait ContentSource: Send + Sync {
    /// The exact number of bytes `open` will yield.
    fn len(&self) -> u64;

    /// Begin streaming the content from the start.
    ///
    /// # Errors
    ///
    /// I/O errors from the underlying storage.
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;

    /// True when the content is zero bytes long.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BytesContent(Vec<u8>);

impl BytesContent {
    /// Wrap a byte buffer.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the underlying bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for BytesContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for BytesContent {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl ContentSource for BytesContent {
    fn len(&self) -> u64 {
        self.0.len() as u64
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.0.as_slice()))
    }
}

/// File-backed content.
///
/// The length is taken from filesystem metadata when the source is created;
/// each `open` re-opens the file, so the source is restartable. A source
/// may carry a temp-path guard that deletes the backing file when the last
/// clone is dropped — the pack reader uses this for inflated records.
#[derive(Clone, Debug)]
pub struct FileContent {
    path: PathBuf,
    len: u64,
    _guard: Option<Arc<TempPath>>,
}

impl FileContent {
    /// Create a source over an existing file, reading its length from
    /// metadata.
    ///
    /// # Errors
    ///
    /// I/O errors from `stat`.
    pub fn open_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let len = std::fs::metadata(&path)?.len();
        Ok(Self { path, len, _guard: None })
    }

    /// Create a source over a temporary file that should be deleted once
    /// every clone of this source is gone.
    #[must_use]
    pub fn from_temp(temp: TempPath, len: u64) -> Self {
        let path = temp.to_path_buf();
        Self { path, len, _guard: Some(Arc::new(temp)) }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ContentSource for FileContent {
    fn len(&self) -> u64 {
        self.len
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(&self.path)?;
        // The length was fixed at construction; never yield more even if
        // the file grew since.
        Ok(Box::new(file.take(self.len)))
    }
}

/// Drain a source into memory. Intended for small objects and tests.
///
/// # Errors
///
/// I/O errors from the source.
pub fn read_to_bytes(source: &dyn ContentSource) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(usize::try_from(source.len()).unwrap_or(0));
    source.open()?.read_to_end(&mut buf)?;
    Ok(buf)
}
