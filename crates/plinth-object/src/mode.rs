//! Tree-entry file modes and their octal wire form.

use std::fmt;

use crate::error::ObjectError;

/// The mode of a tree entry.
///
/// Rendered in tree objects as the shortest octal representation with no
/// leading zero (`40000`, not `040000`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Subdirectory (`040000`).
    Tree,
    /// Regular file (`100644`).
    Regular,
    /// Executable file (`100755`).
    Executable,
    /// Symbolic link (`120000`).
    Symlink,
    /// Gitlink / submodule commit (`160000`).
    Gitlink,
}

impl FileMode {
    /// The numeric mode bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Tree => 0o040_000,
            Self::Regular => 0o100_644,
            Self::Executable => 0o100_755,
            Self::Symlink => 0o120_000,
            Self::Gitlink => 0o160_000,
        }
    }

    /// Interpret numeric mode bits.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidMode`] for anything but the five known modes.
    pub fn from_bits(bits: u32) -> Result<Self, ObjectError> {
        match bits {
            0o040_000 => Ok(Self::Tree),
            0o100_644 => Ok(Self::Regular),
            0o100_755 => Ok(Self::Executable),
            0o120_000 => Ok(Self::Symlink),
            0o160_000 => Ok(Self::Gitlink),
            other => Err(ObjectError::InvalidMode { value: format!("{other:o}").into() }),
        }
    }

    /// The shortest-octal wire form.
    #[must_use]
    pub const fn as_octal_bytes(self) -> &'static [u8] {
        match self {
            Self::Tree => b"40000",
            Self::Regular => b"100644",
            Self::Executable => b"100755",
            Self::Symlink => b"120000",
            Self::Gitlink => b"160000",
        }
    }

    /// Parse the octal wire form of a mode.
    ///
    /// Rejects empty input, a leading zero, non-octal digits, and numeric
    /// values that are not one of the five known modes.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidMode`].
    pub fn from_octal_bytes(octal: &[u8]) -> Result<Self, ObjectError> {
        let invalid = || ObjectError::InvalidMode { value: octal.into() };
        if octal.is_empty() || octal[0] == b'0' || octal.len() > 6 {
            return Err(invalid());
        }
        let mut bits: u32 = 0;
        for &b in octal {
            if !(b'0'..=b'7').contains(&b) {
                return Err(invalid());
            }
            bits = (bits << 3) | u32::from(b - b'0');
        }
        Self::from_bits(bits).map_err(|_| invalid())
    }

    /// True for the tree mode, the only one that names another tree.
    #[must_use]
    pub const fn is_tree(self) -> bool {
        matches!(self, Self::Tree)
    }

    /// True for gitlinks, which hold a commit id and sort like files.
    #[must_use]
    pub const fn is_gitlink(self) -> bool {
        matches!(self, Self::Gitlink)
    }

    /// Whether a name with this mode compares with an implicit trailing `/`
    /// under the tree sort. Gitlinks do not, despite not being blobs.
    #[must_use]
    pub const fn sorts_as_tree(self) -> bool {
        self.is_tree()
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FileMode; 5] = [
        FileMode::Tree,
        FileMode::Regular,
        FileMode::Executable,
        FileMode::Symlink,
        FileMode::Gitlink,
    ];

    #[test]
    fn octal_roundtrip() {
        for mode in ALL {
            assert_eq!(FileMode::from_octal_bytes(mode.as_octal_bytes()).unwrap(), mode);
        }
    }

    #[test]
    fn bits_roundtrip() {
        for mode in ALL {
            assert_eq!(FileMode::from_bits(mode.bits()).unwrap(), mode);
        }
    }

    #[test]
    fn rejects_leading_zero() {
        assert!(FileMode::from_octal_bytes(b"040000").is_err());
        assert!(FileMode::from_octal_bytes(b"0100644").is_err());
    }

    #[test]
    fn rejects_bad_digits_and_unknown_modes() {
        assert!(FileMode::from_octal_bytes(b"10064a").is_err());
        assert!(FileMode::from_octal_bytes(b"100648").is_err());
        assert!(FileMode::from_octal_bytes(b"100645").is_err());
        assert!(FileMode::from_octal_bytes(b"777").is_err());
        assert!(FileMode::from_octal_bytes(b"").is_err());
        assert!(FileMode::from_bits(0o100_600).is_err());
    }

    #[test]
    fn only_trees_sort_as_trees() {
        assert!(FileMode::Tree.sorts_as_tree());
        assert!(!FileMode::Gitlink.sorts_as_tree());
        assert!(!FileMode::Regular.sorts_as_tree());
    }
}
