//! Config lines, entries, and filters.

use bstr::BString;

use crate::error::ConfigError;

/// The value slot of an entry.
///
/// `RemoveAll` is a sentinel higher layers use to signal removal intent;
/// the codec itself renders it exactly like `Missing`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    /// `name` with no `=`: the boolean-true shorthand.
    Missing,
    /// `name = value`.
    Value(BString),
    /// Removal-intent sentinel; not a value.
    RemoveAll,
}

impl ConfigValue {
    /// The stored bytes, if this is an actual value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Value(v) => Some(v.as_slice()),
            Self::Missing | Self::RemoveAll => None,
        }
    }
}

/// One `section[.subsection].name[=value]` assignment.
///
/// Section and name are case-folded to lowercase on the way in; the
/// subsection is case-sensitive and preserved verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigEntry {
    /// Section name, lowercase.
    pub section: String,
    /// Subsection, raw bytes, case-sensitive.
    pub subsection: Option<BString>,
    /// Variable name, lowercase.
    pub name: String,
    /// The value slot.
    pub value: ConfigValue,
}

impl ConfigEntry {
    /// Build an entry, folding section and name to lowercase.
    #[must_use]
    pub fn new(
        section: &str,
        subsection: Option<BString>,
        name: &str,
        value: ConfigValue,
    ) -> Self {
        Self {
            section: section.to_ascii_lowercase(),
            subsection,
            name: name.to_ascii_lowercase(),
            value,
        }
    }

    /// Shorthand for a simple `section.name = value` entry.
    #[must_use]
    pub fn simple(section: &str, name: &str, value: impl Into<BString>) -> Self {
        Self::new(section, None, name, ConfigValue::Value(value.into()))
    }

    /// The `(section, subsection, name)` namespace of this entry.
    #[must_use]
    pub fn namespace(&self) -> (&str, Option<&BString>, &str) {
        (&self.section, self.subsection.as_ref(), &self.name)
    }

    /// True when `other` addresses the same namespace.
    #[must_use]
    pub fn same_namespace(&self, other: &Self) -> bool {
        self.namespace() == other.namespace()
    }

    /// Enforce the entry grammar: section `[-A-Za-z0-9.]+`, subsection
    /// free of NUL and LF, name `[A-Za-z][-A-Za-z0-9]*`, value free of
    /// NUL.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEntry`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEntry { reason };
        if self.section.is_empty()
            || !self
                .section
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
        {
            return Err(invalid(format!("bad section name {:?}", self.section)));
        }
        if let Some(sub) = &self.subsection {
            if sub.iter().any(|&b| b == 0 || b == b'\n') {
                return Err(invalid("subsection contains NUL or newline".to_owned()));
            }
        }
        let mut name_bytes = self.name.bytes();
        let head_ok = name_bytes.next().is_some_and(|b| b.is_ascii_alphabetic());
        if !head_ok || !name_bytes.all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(invalid(format!("bad variable name {:?}", self.name)));
        }
        if let ConfigValue::Value(v) = &self.value {
            if v.contains(&0) {
                return Err(invalid("value contains NUL".to_owned()));
            }
        }
        Ok(())
    }
}

/// One parsed line: the original text plus the entry it carries, if any.
///
/// `context` is the `(section, subsection)` in effect at this line, used
/// to find the end of a section when inserting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigLine {
    /// Original text, without the line terminator. Joined continuation
    /// lines keep their embedded `\`-newline sequences.
    pub text: BString,
    /// The assignment on this line, if it is an assignment line.
    pub entry: Option<ConfigEntry>,
    /// The section scope this line lives in (headers scope themselves).
    pub context: Option<(String, Option<BString>)>,
}

/// A `{section?, subsection?, name?}` match over entries.
///
/// Supplying `section` without `subsection` matches only top-level
/// entries of that section. An entirely empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Section to match, lowercase. `None` matches any section.
    pub section: Option<String>,
    /// Subsection to match, exact bytes.
    pub subsection: Option<BString>,
    /// Variable name to match, lowercase.
    pub name: Option<String>,
}

impl EntryFilter {
    /// Match everything.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Match a section's top-level entries.
    #[must_use]
    pub fn section(section: &str) -> Self {
        Self { section: Some(section.to_ascii_lowercase()), ..Self::default() }
    }

    /// Match one key exactly.
    #[must_use]
    pub fn key(section: &str, subsection: Option<BString>, name: &str) -> Self {
        Self {
            section: Some(section.to_ascii_lowercase()),
            subsection,
            name: Some(name.to_ascii_lowercase()),
        }
    }

    /// True when no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.section.is_none() && self.subsection.is_none() && self.name.is_none()
    }

    /// Does `entry` satisfy this filter?
    #[must_use]
    pub fn matches(&self, entry: &ConfigEntry) -> bool {
        if let Some(section) = &self.section {
            if entry.section != *section {
                return false;
            }
            // Section without subsection means top-level only.
            if entry.subsection.as_ref() != self.subsection.as_ref()
                && (self.subsection.is_some() || entry.subsection.is_some())
            {
                return false;
            }
        } else if let Some(subsection) = &self.subsection {
            if entry.subsection.as_ref() != Some(subsection) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if entry.name != *name {
                return false;
            }
        }
        true
    }
}
