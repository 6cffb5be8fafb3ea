//! Error types for the directory cache.

use bstr::BString;
use thiserror::Error;

/// Errors returned by dir-cache operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The cache as a whole violated an invariant: misordered entries, a
    /// directory/file name conflict, or malformed binary framing.
    #[error("invalid dir cache: {reason}")]
    InvalidDirCache {
        /// What was wrong.
        reason: String,
    },

    /// A single entry was invalid on its own.
    #[error("invalid entry {name}: {reason}")]
    InvalidEntry {
        /// The entry's path.
        name: BString,
        /// What was wrong.
        reason: String,
    },

    /// Two entries shared a `(name, stage)` key.
    #[error("duplicate entries for {name} at stage {stage}")]
    DuplicateEntries {
        /// The conflicting path.
        name: BString,
        /// The conflicting stage.
        stage: u8,
    },

    /// The on-disk index was not version 2.
    #[error("unsupported index version {version}")]
    UnsupportedVersion {
        /// The version found.
        version: u32,
    },

    /// The entry count exceeded [`crate::MAX_ENTRIES`].
    #[error("too many index entries: {count}")]
    TooManyEntries {
        /// The declared count.
        count: u32,
    },

    /// A mandatory (lowercase-initial) extension was present.
    #[error("unsupported mandatory index extension {signature}")]
    UnsupportedExtension {
        /// The four-byte extension signature.
        signature: BString,
    },

    /// The trailing SHA-1 did not match the stream contents.
    #[error("index checksum mismatch")]
    ShaHashMismatch,

    /// A codec operation was handed a stream without the trailing-hash
    /// capability.
    #[error("stream is not a trailing-hash device")]
    NotShaHashDevice,

    /// Tree materialization hit an entry with a non-zero merge stage.
    #[error("unmerged entry at {name}")]
    UnmergedEntry {
        /// The conflicted path.
        name: BString,
    },

    /// Tree materialization found no tree at the requested prefix.
    #[error("no tree at prefix {prefix}")]
    PrefixNotFound {
        /// The requested prefix.
        prefix: BString,
    },

    /// An object-layer error (bad id, bad mode, tree validation).
    #[error(transparent)]
    Object(#[from] plinth_object::ObjectError),

    /// A path-grammar error from entry validation.
    #[error(transparent)]
    Path(#[from] plinth_path::PathError),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
