//! The config file model and its mutation operations.

use bstr::BString;

use crate::error::ConfigError;
use crate::line::{ConfigEntry, ConfigLine, ConfigValue, EntryFilter};
use crate::parse::parse_lines;

/// How [`ConfigFile::add_entries`] treats keys that already exist.
///
/// The two option flags of the operation are mutually exclusive, so they
/// are one enum: the forbidden combination cannot be expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddMode {
    /// Replace a single existing line; fail on a multi-valued key.
    #[default]
    Default,
    /// Keep existing lines and append after them.
    Add,
    /// Drop every existing line for the key, then insert.
    ReplaceAll,
}

/// A parsed config file: the line list plus original-text fidelity.
///
/// All mutation operations return a new `ConfigFile`, leaving untouched
/// lines byte-for-byte identical in the rendered output.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ConfigFile {
    lines: Vec<ConfigLine>,
    trailing_newline: bool,
}

impl ConfigFile {
    /// Parse a file's bytes.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`].
    pub fn parse(bytes: &[u8]) -> Result<Self, ConfigError> {
        let (lines, trailing_newline) = parse_lines(bytes)?;
        Ok(Self { lines, trailing_newline })
    }

    /// The empty file.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Serialize back to bytes. Untouched lines render exactly as parsed.
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            out.extend_from_slice(&line.text);
            if i + 1 < self.lines.len() || self.trailing_newline {
                out.push(b'\n');
            }
        }
        out
    }

    /// The parsed lines.
    #[must_use]
    pub fn lines(&self) -> &[ConfigLine] {
        &self.lines
    }

    /// All entries matching `filter`, in file order.
    #[must_use]
    pub fn get_entries(&self, filter: &EntryFilter) -> Vec<ConfigEntry> {
        self.lines
            .iter()
            .filter_map(|l| l.entry.as_ref())
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Insert or replace entries.
    ///
    /// Entries are grouped by `(section, subsection, name)` namespace and
    /// applied in order. Existing lines outside the touched namespaces are
    /// preserved exactly; a namespace whose section has no header yet gets
    /// a synthetic header appended.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEntry`] for entries failing the grammar, and
    /// [`ConfigError::ReplacingMultivar`] when [`AddMode::Default`] meets
    /// a key that holds more than one value.
    pub fn add_entries(
        &self,
        entries: Vec<ConfigEntry>,
        mode: AddMode,
    ) -> Result<Self, ConfigError> {
        for entry in &entries {
            entry.validate()?;
        }

        let mut next = self.clone();
        let mut remaining = entries;
        while !remaining.is_empty() {
            let head = remaining.remove(0);
            let mut group = vec![head];
            remaining.retain(|e| {
                if e.same_namespace(&group[0]) {
                    group.push(e.clone());
                    false
                } else {
                    true
                }
            });
            next = next.apply_group(group, mode)?;
        }
        Ok(next)
    }

    /// Apply one namespace's worth of new entries.
    fn apply_group(&self, group: Vec<ConfigEntry>, mode: AddMode) -> Result<Self, ConfigError> {
        let ns = group[0].clone();
        let matches: Vec<usize> = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.entry.as_ref().is_some_and(|e| e.same_namespace(&ns)))
            .map(|(i, _)| i)
            .collect();

        let rendered: Vec<ConfigLine> = group.iter().map(|e| entry_line(e)).collect();
        let mut lines = self.lines.clone();

        match (mode, matches.as_slice()) {
            (AddMode::Default, []) | (AddMode::Add, []) | (AddMode::ReplaceAll, []) => {
                self.insert_at_section_end(&mut lines, &ns, rendered);
            }
            (AddMode::Default, [single]) => {
                lines.splice(*single..=*single, rendered);
            }
            (AddMode::Default, _) => {
                return Err(ConfigError::ReplacingMultivar {
                    section: ns.section,
                    subsection: ns.subsection,
                    name: ns.name,
                });
            }
            (AddMode::Add, existing) => {
                let after = existing[existing.len() - 1] + 1;
                lines.splice(after..after, rendered);
            }
            (AddMode::ReplaceAll, existing) => {
                // Drop every matching line, then insert at the position of
                // the first.
                let first = existing[0];
                for &idx in existing.iter().rev() {
                    lines.remove(idx);
                }
                lines.splice(first..first, rendered);
            }
        }

        Ok(Self { lines, trailing_newline: true })
    }

    /// Insert rendered entry lines after the last line of the namespace's
    /// section, creating a header at the end of the file if the section
    /// does not exist yet.
    fn insert_at_section_end(
        &self,
        lines: &mut Vec<ConfigLine>,
        ns: &ConfigEntry,
        rendered: Vec<ConfigLine>,
    ) {
        let scope = (ns.section.clone(), ns.subsection.clone());
        let last_in_section = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| l.context.as_ref() == Some(&scope))
            .map(|(i, _)| i)
            .next_back();

        match last_in_section {
            Some(idx) => {
                lines.splice(idx + 1..idx + 1, rendered);
            }
            None => {
                lines.push(header_line(&ns.section, ns.subsection.as_deref().map(Vec::as_slice)));
                lines.extend(rendered);
            }
        }
    }

    /// Drop every line whose entry matches `filter`. An empty filter
    /// truncates the file.
    #[must_use]
    pub fn remove_entries(&self, filter: &EntryFilter) -> Self {
        if filter.is_empty() {
            return Self { lines: Vec::new(), trailing_newline: false };
        }
        let lines = self
            .lines
            .iter()
            .filter(|l| !l.entry.as_ref().is_some_and(|e| filter.matches(e)))
            .cloned()
            .collect();
        Self { lines, trailing_newline: true }
    }
}

/// Render a new assignment line: `\t{name} = {value}`.
fn entry_line(entry: &ConfigEntry) -> ConfigLine {
    let mut text: Vec<u8> = vec![b'\t'];
    text.extend_from_slice(entry.name.as_bytes());
    match &entry.value {
        ConfigValue::Value(v) => {
            text.extend_from_slice(b" = ");
            text.extend_from_slice(&escape_value(v));
        }
        // The remove-all sentinel is not a value; it renders like one.
        ConfigValue::Missing | ConfigValue::RemoveAll => {}
    }
    ConfigLine {
        text: text.into(),
        entry: Some(entry.clone()),
        context: Some((entry.section.clone(), entry.subsection.clone())),
    }
}

/// Render a synthetic section header.
fn header_line(section: &str, subsection: Option<&[u8]>) -> ConfigLine {
    let mut text: Vec<u8> = vec![b'['];
    text.extend_from_slice(section.as_bytes());
    if let Some(sub) = subsection {
        text.extend_from_slice(b" \"");
        for &b in sub {
            if b == b'"' || b == b'\\' {
                text.push(b'\\');
            }
            text.push(b);
        }
        text.push(b'"');
    }
    text.push(b']');
    ConfigLine {
        text: text.into(),
        entry: None,
        context: Some((section.to_owned(), subsection.map(BString::from))),
    }
}

/// Escape a value for rendering: backslash and quote always; quote the
/// whole value when it has edge whitespace or comment characters.
fn escape_value(value: &BString) -> Vec<u8> {
    let mut body = Vec::with_capacity(value.len());
    for &b in value.iter() {
        match b {
            b'\\' => body.extend_from_slice(b"\\\\"),
            b'"' => body.extend_from_slice(b"\\\""),
            b'\n' => body.extend_from_slice(b"\\n"),
            b'\t' => body.extend_from_slice(b"\\t"),
            0x08 => body.extend_from_slice(b"\\b"),
            other => body.push(other),
        }
    }
    let needs_quotes = value.first().is_some_and(|b| b.is_ascii_whitespace())
        || value.last().is_some_and(|b| b.is_ascii_whitespace())
        || value.contains(&b'#')
        || value.contains(&b';');
    if needs_quotes {
        let mut quoted = vec![b'"'];
        quoted.extend_from_slice(&body);
        quoted.push(b'"');
        quoted
    } else {
        body
    }
}
