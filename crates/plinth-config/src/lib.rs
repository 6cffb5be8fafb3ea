//! Line-preserving git config files.
//!
//! The parser keeps every physical line's original text next to the
//! structured entry it carries (if any), so rewrites touch only the lines
//! they must and leave everything else byte-for-byte intact. Mutations are
//! multivar-aware: replacing a key that currently holds several values is
//! an error unless the caller asked for replace-all semantics.
//!
//! Concurrency lives in [`store`]: one serialized handle per tracked file,
//! reloading its cached parse when the on-disk fingerprint drifts.
//!
//! # Crate layout
//!
//! - [`line`] — [`ConfigLine`], [`ConfigEntry`], filters, the value
//!   sentinel.
//! - [`parse`] — the lexer/parser.
//! - [`file`] — [`ConfigFile`]: get/add/remove over the line list.
//! - [`store`] — [`ConfigStore`]/[`ConfigHandle`]: per-path serialization,
//!   fingerprint reload, atomic rewrite.

pub mod error;
pub mod file;
pub mod line;
pub mod parse;
pub mod store;

pub use error::ConfigError;
pub use file::{AddMode, ConfigFile};
pub use line::{ConfigEntry, ConfigLine, ConfigValue, EntryFilter};
pub use store::{ConfigHandle, ConfigStore};
