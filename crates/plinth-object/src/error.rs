//! The single error type for object parsing, validation, and encoding.

use bstr::BString;
use thiserror::Error;

/// Errors returned by the object codecs.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// A string or byte sequence was not a 40-character lowercase-hex id.
    #[error("invalid object id `{value}`: {reason}")]
    InvalidObjectId {
        /// The raw value that failed.
        value: BString,
        /// Why it failed.
        reason: String,
    },

    /// A tree-entry mode was not one of the five known modes or was not in
    /// canonical octal form.
    #[error("invalid file mode `{value}`")]
    InvalidMode {
        /// The raw mode bytes.
        value: BString,
    },

    /// A tree-entry name failed path validation.
    #[error(transparent)]
    InvalidName(#[from] plinth_path::PathError),

    /// A tree could not be parsed or violated the tree sort invariants.
    #[error("invalid tree: {reason}")]
    InvalidTree {
        /// What was wrong.
        reason: String,
    },

    /// A commit could not be parsed or violated the commit invariants.
    #[error("invalid commit: {reason}")]
    InvalidCommit {
        /// What was wrong.
        reason: String,
    },

    /// A tag could not be parsed or violated the tag invariants.
    #[error("invalid tag: {reason}")]
    InvalidTag {
        /// What was wrong.
        reason: String,
    },

    /// A loose-object header or other framing was malformed.
    #[error("invalid object format: {reason}")]
    InvalidFormat {
        /// What was wrong.
        reason: String,
    },

    /// An I/O error from a content source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
