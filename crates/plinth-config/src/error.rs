//! Config codec errors.

use bstr::BString;
use thiserror::Error;

/// Errors from parsing, mutating, or persisting a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A line could not be parsed.
    #[error("config parse error on line {line}: {reason}")]
    Parse {
        /// 1-based logical line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A default-mode write targeted a key that holds several values.
    #[error("cannot replace multi-valued key {section}{}.{name}", subsection_display(.subsection))]
    ReplacingMultivar {
        /// Target section (lowercase).
        section: String,
        /// Target subsection, if any.
        subsection: Option<BString>,
        /// Target variable name (lowercase).
        name: String,
    },

    /// An entry handed to a write operation failed the entry grammar.
    #[error("invalid config entry: {reason}")]
    InvalidEntry {
        /// What was wrong.
        reason: String,
    },

    /// An I/O error from the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn subsection_display(subsection: &Option<BString>) -> String {
    subsection
        .as_ref()
        .map(|s| format!(" \"{s}\""))
        .unwrap_or_default()
}
