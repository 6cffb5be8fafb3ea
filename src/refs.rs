//! Ref values: validated names and targets.
//!
//! Only the grammar lives here — physical ref storage is a backend
//! concern. A target is either a direct object id or a symbolic
//! `"ref: "` link whose destination must itself be a valid name inside
//! `refs/`.

use std::fmt;

use plinth_object::ObjectId;
use plinth_path::refname::{check_ref_name_with, RefNameOptions};

use crate::error::RepoError;

/// What a ref points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefTarget {
    /// A direct object id.
    Id(ObjectId),
    /// A symbolic link to another ref.
    Symbolic(String),
}

impl RefTarget {
    /// Parse the stored form: 40 hex characters, or `"ref: "` followed by
    /// a ref name.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidRefName`] / [`RepoError::Object`] when neither
    /// form fits.
    pub fn parse(bytes: &[u8]) -> Result<Self, RepoError> {
        let trimmed = trim_newline(bytes);
        if let Some(link) = trimmed.strip_prefix(b"ref: ") {
            let name = String::from_utf8(link.to_vec()).map_err(|_| {
                RepoError::InvalidLinkTarget { target: String::from_utf8_lossy(link).into_owned() }
            })?;
            check_link_target(&name)?;
            return Ok(Self::Symbolic(name));
        }
        Ok(Self::Id(ObjectId::from_hex(trimmed)?))
    }

    /// The stored form, newline-terminated as on disk.
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        match self {
            Self::Id(id) => format!("{id}\n").into_bytes(),
            Self::Symbolic(name) => format!("ref: {name}\n").into_bytes(),
        }
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Symbolic(name) => write!(f, "ref: {name}"),
        }
    }
}

/// A named ref and its target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ref {
    name: String,
    target: RefTarget,
}

impl Ref {
    /// Build a ref, validating the name and (for symbolic targets) the
    /// link destination.
    ///
    /// `HEAD` is accepted as a name; other single-level names are not.
    ///
    /// # Errors
    ///
    /// [`RepoError::InvalidRefName`] and [`RepoError::InvalidLinkTarget`].
    pub fn new(name: impl Into<String>, target: RefTarget) -> Result<Self, RepoError> {
        let name = name.into();
        check_ref_name_with(name.as_bytes(), RefNameOptions::default())?;
        if let RefTarget::Symbolic(link) = &target {
            check_link_target(link)?;
        }
        Ok(Self { name, target })
    }

    /// A direct ref at an object id.
    ///
    /// # Errors
    ///
    /// As [`Ref::new`].
    pub fn direct(name: impl Into<String>, id: ObjectId) -> Result<Self, RepoError> {
        Self::new(name, RefTarget::Id(id))
    }

    /// A symbolic ref (like `HEAD` pointing at a branch).
    ///
    /// # Errors
    ///
    /// As [`Ref::new`].
    pub fn symbolic(name: impl Into<String>, link: impl Into<String>) -> Result<Self, RepoError> {
        Self::new(name, RefTarget::Symbolic(link.into()))
    }

    /// The validated name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The target.
    #[must_use]
    pub const fn target(&self) -> &RefTarget {
        &self.target
    }
}

/// Symbolic link targets must be valid ref names inside `refs/`.
fn check_link_target(target: &str) -> Result<(), RepoError> {
    check_ref_name_with(target.as_bytes(), RefNameOptions::default())?;
    if target.starts_with("refs/") {
        Ok(())
    } else {
        Err(RepoError::InvalidLinkTarget { target: target.to_owned() })
    }
}

fn trim_newline(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(b"\n").unwrap_or(bytes)
}
