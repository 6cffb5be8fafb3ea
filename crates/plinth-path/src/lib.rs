//! The portable git path grammar.
//!
//! Git stores paths as raw byte sequences with no character encoding
//! attached. This crate validates those bytes the way git's own tree and
//! index writers do: it screens out names that are hostile on Windows or
//! macOS filesystems (`.git` look-alikes, NTFS 8.3 aliases, reserved device
//! names), and it defines the two orderings the rest of the library depends
//! on — the tree sort (directories compare as if suffixed with `/`) and the
//! plain byte sort used by the directory cache.
//!
//! # Crate layout
//!
//! - [`check`] — full-path and single-segment validation.
//! - [`gitmodules`] — the `.gitmodules` NTFS short-name recognizer.
//! - [`sort`] — tree and same-name comparators.
//! - [`refname`] — the `git check-ref-format` ref-name grammar.

pub mod check;
pub mod gitmodules;
pub mod refname;
pub mod sort;

pub use check::{check_path, check_path_segment, PathError, PathPlatforms};
pub use gitmodules::is_gitmodules;
pub use refname::{check_ref_name, RefNameError};
pub use sort::{compare_same_name, compare_tree_names};
