//! Pack reader errors.

use plinth_object::ObjectId;
use thiserror::Error;

/// Errors from pack index parsing and object retrieval.
#[derive(Debug, Error)]
pub enum PackError {
    /// The `.idx` file was malformed: bad length, non-monotonic fanout,
    /// or an unknown version.
    #[error("invalid pack index: {reason}")]
    InvalidIndex {
        /// What was wrong.
        reason: String,
    },

    /// The `.pack` file contents did not decode: bad magic, bad record
    /// header, or an inflated size mismatch.
    #[error("invalid pack object: {reason}")]
    InvalidObject {
        /// What was wrong.
        reason: String,
    },

    /// The requested id is not in this pack.
    #[error("object {id} not found in pack")]
    NotFound {
        /// The id that was asked for.
        id: ObjectId,
    },

    /// The record is deltified; delta resolution is not implemented.
    #[error("deltified pack record ({kind}) is not supported")]
    UnsupportedDelta {
        /// `ofs_delta` or `ref_delta`.
        kind: &'static str,
    },

    /// An object-layer error.
    #[error(transparent)]
    Object(#[from] plinth_object::ObjectError),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
