//! Commit objects.

use std::io;

use bstr::{BString, ByteSlice};

use crate::content::BytesContent;
use crate::error::ObjectError;
use crate::id::ObjectId;
use crate::kind::ObjectKind;
use crate::object::Object;
use crate::parse::{header_value, take_line};
use crate::person::PersonIdent;

/// A commit: a tree, its ancestry, two identities, and a message.
///
/// Parents are stored deduplicated in first-seen order, which is also how
/// they serialize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// The root tree of the snapshot.
    pub tree: ObjectId,
    parents: Vec<ObjectId>,
    /// Who wrote the change.
    pub author: PersonIdent,
    /// Who recorded the commit.
    pub committer: PersonIdent,
    /// Commit message, raw bytes, never empty.
    pub message: BString,
}

impl Commit {
    /// Build a commit, validating its invariants.
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidCommit`] on a zero tree or parent id, an
    /// unsanitized identity, or an empty message.
    pub fn new(
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: PersonIdent,
        committer: PersonIdent,
        message: impl Into<BString>,
    ) -> Result<Self, ObjectError> {
        let commit = Self {
            tree,
            parents: dedup_first_seen(parents),
            author,
            committer,
            message: message.into(),
        };
        commit.validate()?;
        Ok(commit)
    }

    /// Parent ids, deduplicated, first-seen order.
    #[must_use]
    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    fn validate(&self) -> Result<(), ObjectError> {
        let invalid = |reason: String| ObjectError::InvalidCommit { reason };
        if self.tree.is_zero() {
            return Err(invalid("zero tree id".to_owned()));
        }
        if let Some(parent) = self.parents.iter().find(|p| p.is_zero()) {
            return Err(invalid(format!("zero parent id {parent}")));
        }
        if !self.author.is_valid() {
            return Err(invalid("author identity is not in canonical form".to_owned()));
        }
        if !self.committer.is_valid() {
            return Err(invalid("committer identity is not in canonical form".to_owned()));
        }
        if self.message.is_empty() {
            return Err(invalid("empty message".to_owned()));
        }
        Ok(())
    }

    /// Canonical serialization.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');
        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }
        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author.to_external_bytes());
        out.push(b'\n');
        out.extend_from_slice(b"committer ");
        out.extend_from_slice(&self.committer.to_external_bytes());
        out.push(b'\n');
        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    /// Parse the canonical serialization.
    ///
    /// Headers must appear in order: `tree`, any number of `parent`,
    /// `author`, `committer`, then the blank separator line. Anything else
    /// before the separator is an error; everything after it is the
    /// message, opaquely (signatures included).
    ///
    /// # Errors
    ///
    /// [`ObjectError::InvalidCommit`] on any malformed or misplaced
    /// header.
    pub fn parse(bytes: &[u8]) -> Result<Self, ObjectError> {
        let invalid = |reason: &str| ObjectError::InvalidCommit { reason: reason.to_owned() };

        let (line, mut rest) = take_line(bytes).ok_or_else(|| invalid("missing tree header"))?;
        let tree_hex = header_value(line, b"tree").ok_or_else(|| invalid("missing tree header"))?;
        let tree = ObjectId::from_hex(tree_hex)
            .map_err(|_| invalid("malformed tree id"))?;

        let mut parents = Vec::new();
        while let Some((line, next)) = take_line(rest) {
            let Some(parent_hex) = header_value(line, b"parent") else {
                break;
            };
            parents.push(
                ObjectId::from_hex(parent_hex).map_err(|_| invalid("malformed parent id"))?,
            );
            rest = next;
        }

        let (line, rest2) = take_line(rest).ok_or_else(|| invalid("missing author header"))?;
        let author_raw =
            header_value(line, b"author").ok_or_else(|| invalid("missing author header"))?;
        let author =
            PersonIdent::parse(author_raw).ok_or_else(|| invalid("malformed author identity"))?;

        let (line, rest3) = take_line(rest2).ok_or_else(|| invalid("missing committer header"))?;
        let committer_raw =
            header_value(line, b"committer").ok_or_else(|| invalid("missing committer header"))?;
        let committer = PersonIdent::parse(committer_raw)
            .ok_or_else(|| invalid("malformed committer identity"))?;

        let message = rest3
            .strip_prefix(b"\n")
            .ok_or_else(|| invalid("unknown header before message separator"))?;

        Self::new(tree, parents, author, committer, message.as_bstr())
    }

    /// Wrap the serialization into an [`Object`], computing its id.
    ///
    /// # Errors
    ///
    /// I/O errors from hashing (none in practice for in-memory content).
    pub fn to_object(&self) -> io::Result<Object> {
        Object::new(ObjectKind::Commit, BytesContent::new(self.serialize()))
    }
}

fn dedup_first_seen(parents: Vec<ObjectId>) -> Vec<ObjectId> {
    let mut seen = Vec::with_capacity(parents.len());
    for parent in parents {
        if !seen.contains(&parent) {
            seen.push(parent);
        }
    }
    seen
}
