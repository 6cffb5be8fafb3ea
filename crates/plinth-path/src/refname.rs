//! The `git check-ref-format` name grammar.
//!
//! Validates ref names only; physical ref storage lives elsewhere. The
//! special name `HEAD` always passes. Ordinary names must contain a `/`
//! unless the caller explicitly permits single-level names.

use bstr::{BString, ByteSlice};
use thiserror::Error;

/// Options for [`check_ref_name_with`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefNameOptions {
    /// Accept names without a `/`, as `git check-ref-format --allow-onelevel`
    /// does.
    pub allow_single_level: bool,
}

/// Errors from ref-name validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefNameError {
    /// The name was empty.
    #[error("empty ref name")]
    Empty,

    /// The name was exactly `@`.
    #[error("ref name must not be '@'")]
    LoneAt,

    /// The name began with `/`.
    #[error("ref name starts with '/': {0}")]
    StartsWithSlash(BString),

    /// The name ended with `/`.
    #[error("ref name ends with '/': {0}")]
    EndsWithSlash(BString),

    /// The name contained `//`.
    #[error("ref name contains '//': {0}")]
    RepeatedSlash(BString),

    /// The name contained `..`.
    #[error("ref name contains '..': {0}")]
    DoubleDot(BString),

    /// The name contained the revparse marker `@{`.
    #[error("ref name contains '@{{': {0}")]
    AtOpenBrace(BString),

    /// The name ended with `.`.
    #[error("ref name ends with '.': {0}")]
    TrailingDot(BString),

    /// The name contained a control byte, space, or one of `~ ^ : ? * [ \`.
    #[error("ref name contains forbidden byte 0x{byte:02x}: {name}")]
    InvalidByte {
        /// The offending byte.
        byte: u8,
        /// The full name.
        name: BString,
    },

    /// A slash-separated component began with `.`.
    #[error("ref component starts with '.': {0}")]
    ComponentStartsWithDot(BString),

    /// A slash-separated component ended with `.lock`.
    #[error("ref component ends with '.lock': {0}")]
    ComponentEndsWithLock(BString),

    /// The name had no `/` and single-level names were not permitted.
    #[error("single-level ref name not permitted: {0}")]
    SingleLevel(BString),
}

/// Validate a ref name with the default rules (single-level names other
/// than `HEAD` rejected).
///
/// # Errors
///
/// Any [`RefNameError`].
pub fn check_ref_name(name: &[u8]) -> Result<(), RefNameError> {
    check_ref_name_with(name, RefNameOptions::default())
}

/// Validate a ref name.
///
/// # Errors
///
/// Any [`RefNameError`].
pub fn check_ref_name_with(name: &[u8], opts: RefNameOptions) -> Result<(), RefNameError> {
    if name == b"HEAD" {
        return Ok(());
    }
    if name.is_empty() {
        return Err(RefNameError::Empty);
    }
    if name == b"@" {
        return Err(RefNameError::LoneAt);
    }
    if name[0] == b'/' {
        return Err(RefNameError::StartsWithSlash(name.into()));
    }
    if name.ends_with(b"/") {
        return Err(RefNameError::EndsWithSlash(name.into()));
    }
    for &b in name {
        if b <= 0x20
            || b == 0x7F
            || matches!(b, b'~' | b'^' | b':' | b'?' | b'*' | b'[' | b'\\')
        {
            return Err(RefNameError::InvalidByte { byte: b, name: name.into() });
        }
    }
    if name.find(b"//").is_some() {
        return Err(RefNameError::RepeatedSlash(name.into()));
    }
    if name.find(b"..").is_some() {
        return Err(RefNameError::DoubleDot(name.into()));
    }
    if name.find(b"@{").is_some() {
        return Err(RefNameError::AtOpenBrace(name.into()));
    }
    if name.ends_with(b".") {
        return Err(RefNameError::TrailingDot(name.into()));
    }
    for component in name.split(|&b| b == b'/') {
        if component.first() == Some(&b'.') {
            return Err(RefNameError::ComponentStartsWithDot(name.into()));
        }
        if component.ends_with(b".lock") {
            return Err(RefNameError::ComponentEndsWithLock(name.into()));
        }
    }
    if !name.contains(&b'/') && !opts.allow_single_level {
        return Err(RefNameError::SingleLevel(name.into()));
    }
    Ok(())
}
