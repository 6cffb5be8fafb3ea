//! Validation of tree-entry names and full repository paths.
//!
//! Two entry points: [`check_path`] for a full slash-separated path and
//! [`check_path_segment`] for a single tree-entry name. Both take a
//! [`PathPlatforms`] describing which hostile filesystems the name must
//! additionally survive. The platform-independent rules (NUL, `/`, the
//! `.git` family, the NTFS `git~1` alias) are always enforced.

use bstr::{BString, ByteSlice};
use thiserror::Error;

/// Which hostile-filesystem screens to apply on top of the core rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathPlatforms {
    /// Reject names that are unrepresentable or dangerous on Windows
    /// (reserved device names, trailing dot/space, special characters).
    pub windows: bool,
    /// Reject names that HFS+ normalization would turn into `.git`, and
    /// truncated UTF-8 tails that could hide such normalization.
    pub macos: bool,
}

impl PathPlatforms {
    /// No platform screening beyond the core rules.
    pub const NONE: Self = Self { windows: false, macos: false };
    /// Screen for every supported platform.
    pub const ALL: Self = Self { windows: true, macos: true };
}

/// Errors from [`check_path`] and [`check_path_segment`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The whole path was empty.
    #[error("empty path")]
    EmptyPath,

    /// The path began with `/`.
    #[error("absolute path: {0}")]
    AbsolutePath(BString),

    /// The path contained `//`.
    #[error("duplicate slash in path: {0}")]
    DuplicateSlash(BString),

    /// The path ended with `/`.
    #[error("trailing slash in path: {0}")]
    TrailingSlash(BString),

    /// A segment was empty.
    #[error("empty name")]
    EmptyName,

    /// A segment contained a forbidden byte or matched a forbidden alias.
    #[error("invalid name: {0}")]
    InvalidName(BString),

    /// A segment was one of the reserved `.`/`..`/`.git` family names.
    #[error("reserved name: {0}")]
    ReservedName(BString),

    /// A segment ended in a truncated UTF-8 sequence that could hide an
    /// HFS+-ignorable code point.
    #[error("invalid UTF-8 sequence at end of name: {0}")]
    InvalidUtf8Sequence(BString),
}

/// Validate a full slash-separated repository path.
///
/// # Errors
///
/// [`PathError::EmptyPath`], [`PathError::AbsolutePath`],
/// [`PathError::DuplicateSlash`], [`PathError::TrailingSlash`], or any
/// segment error from [`check_path_segment`].
pub fn check_path(path: &[u8], platforms: PathPlatforms) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::EmptyPath);
    }
    if path[0] == b'/' {
        return Err(PathError::AbsolutePath(path.into()));
    }
    if path.ends_with(b"/") {
        return Err(PathError::TrailingSlash(path.into()));
    }
    if path.find(b"//").is_some() {
        return Err(PathError::DuplicateSlash(path.into()));
    }
    for segment in path.split(|&b| b == b'/') {
        check_path_segment(segment, platforms)?;
    }
    Ok(())
}

/// Validate a single tree-entry name.
///
/// # Errors
///
/// [`PathError::EmptyName`], [`PathError::InvalidName`],
/// [`PathError::ReservedName`], or [`PathError::InvalidUtf8Sequence`].
pub fn check_path_segment(name: &[u8], platforms: PathPlatforms) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::EmptyName);
    }
    if name.iter().any(|&b| b == 0 || b == b'/') {
        return Err(PathError::InvalidName(name.into()));
    }
    if is_dot_git_family(name) {
        return Err(PathError::ReservedName(name.into()));
    }
    // NTFS 8.3 alias of `.git`.
    if name.eq_ignore_ascii_case(b"git~1") {
        return Err(PathError::InvalidName(name.into()));
    }
    if platforms.windows {
        check_windows_segment(name)?;
    }
    if platforms.macos {
        check_macos_segment(name)?;
    }
    Ok(())
}

/// `.`, `..`, and every spelling NTFS/HFS name stripping can collapse into
/// `.git`: any case of `.git` followed by nothing but dots and spaces.
fn is_dot_git_family(name: &[u8]) -> bool {
    if name == b"." || name == b".." {
        return true;
    }
    if name.len() < 4 || !name[..4].eq_ignore_ascii_case(b".git") {
        return false;
    }
    name[4..].iter().all(|&b| b == b'.' || b == b' ')
}

fn check_windows_segment(name: &[u8]) -> Result<(), PathError> {
    for &b in name {
        if matches!(b, b'"' | b'*' | b':' | b'<' | b'>' | b'?' | b'\\' | b'|')
            || (0x01..=0x1F).contains(&b)
        {
            return Err(PathError::InvalidName(name.into()));
        }
    }
    // Windows strips a trailing dot or space when creating the file.
    if matches!(name.last(), Some(b'.' | b' ')) {
        return Err(PathError::InvalidName(name.into()));
    }
    if is_windows_device(name) {
        return Err(PathError::InvalidName(name.into()));
    }
    Ok(())
}

/// Reserved DOS device names, with or without an extension: `aux`, `con`,
/// `nul`, `prn`, `com1`..`com9`, `lpt1`..`lpt9`.
fn is_windows_device(name: &[u8]) -> bool {
    let stem_matches = |len: usize| name.len() == len || name.get(len) == Some(&b'.');
    if name.len() >= 3 {
        let head = &name[..3];
        for device in [b"aux", b"con", b"nul", b"prn"] {
            if head.eq_ignore_ascii_case(device) && stem_matches(3) {
                return true;
            }
        }
        if (head.eq_ignore_ascii_case(b"com") || head.eq_ignore_ascii_case(b"lpt"))
            && matches!(name.get(3), Some(b'1'..=b'9'))
            && stem_matches(4)
        {
            return true;
        }
    }
    false
}

fn check_macos_segment(name: &[u8]) -> Result<(), PathError> {
    if ends_with_truncated_ignorable(name) {
        return Err(PathError::InvalidUtf8Sequence(name.into()));
    }
    if matches_dot_git_ignoring_hfs_codepoints(name) {
        return Err(PathError::ReservedName(name.into()));
    }
    Ok(())
}

/// `0xE2` and `0xEF` both open three-byte UTF-8 sequences; fewer than two
/// continuation bytes after one means the name was cut mid code point.
fn ends_with_truncated_ignorable(name: &[u8]) -> bool {
    let tail_start = name.len().saturating_sub(2);
    name[tail_start..].iter().any(|&b| b == 0xE2 || b == 0xEF)
}

/// Compare against `.git` (ASCII case-insensitively) after dropping the
/// code points HFS+ treats as ignorable: U+200C..U+200F, U+202A..U+202E,
/// U+206A..U+206F, and U+FEFF.
fn matches_dot_git_ignoring_hfs_codepoints(name: &[u8]) -> bool {
    const DOT_GIT: &[u8] = b".git";
    let mut matched = 0;
    let mut i = 0;
    while i < name.len() {
        match name[i] {
            0xE2 => {
                let Some(skip) = hfs_ignorable_len_e2(&name[i..]) else {
                    return false;
                };
                i += skip;
            }
            0xEF => {
                // U+FEFF, the byte-order mark.
                if name[i..].starts_with(&[0xEF, 0xBB, 0xBF]) {
                    i += 3;
                } else {
                    return false;
                }
            }
            b => {
                if matched == DOT_GIT.len() || !b.eq_ignore_ascii_case(&DOT_GIT[matched]) {
                    return false;
                }
                matched += 1;
                i += 1;
            }
        }
    }
    matched == DOT_GIT.len()
}

/// Length of an HFS-ignorable sequence starting with `0xE2`, or `None` if
/// the bytes encode something else.
fn hfs_ignorable_len_e2(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < 3 {
        return None;
    }
    match (bytes[1], bytes[2]) {
        // U+200C..U+200F zero-width and directional marks.
        (0x80, 0x8C..=0x8F)
        // U+202A..U+202E directional embedding and overrides.
        | (0x80, 0xAA..=0xAE)
        // U+206A..U+206F deprecated format characters.
        | (0x81, 0xAA..=0xAF) => Some(3),
        _ => None,
    }
}
