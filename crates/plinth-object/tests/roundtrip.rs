//! Property tests: parsing a serialized object yields an equal value.

use bstr::BString;
use proptest::prelude::*;

use plinth_object::{Commit, FileMode, ObjectId, ObjectKind, PersonIdent, Tag, Tree, TreeEntry};

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn nonzero_id() -> impl Strategy<Value = ObjectId> {
    any::<[u8; 20]>()
        .prop_filter("zero id is reserved", |b| b.iter().any(|&x| x != 0))
        .prop_map(ObjectId::from_bytes)
}

/// Plain alphanumeric segment names; path screening is tested elsewhere.
fn segment_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,11}"
        .prop_filter("reserved names", |s| !s.starts_with('.') && !s.ends_with('.'))
}

fn person() -> impl Strategy<Value = PersonIdent> {
    (
        "[A-Za-z][A-Za-z .]{0,15}[A-Za-z]",
        "[a-z0-9.]{1,10}@[a-z0-9.]{1,10}",
        0i64..=4_000_000_000,
        -1000i32..=1000,
    )
        .prop_map(|(name, email, secs, tz)| PersonIdent::new(name, email, secs * 1000, tz))
}

fn message() -> impl Strategy<Value = BString> {
    proptest::collection::vec(any::<u8>(), 1..200)
        .prop_map(BString::from)
}

fn file_mode() -> impl Strategy<Value = FileMode> {
    prop_oneof![
        Just(FileMode::Regular),
        Just(FileMode::Executable),
        Just(FileMode::Symlink),
        Just(FileMode::Gitlink),
        Just(FileMode::Tree),
    ]
}

fn tree() -> impl Strategy<Value = Tree> {
    proptest::collection::btree_map(segment_name(), (file_mode(), nonzero_id()), 0..16).prop_map(
        |entries| {
            let entries = entries
                .into_iter()
                .map(|(name, (mode, id))| TreeEntry::new(name, mode, id))
                .collect();
            Tree::from_unsorted(entries).expect("generated entries are valid")
        },
    )
}

// ---------------------------------------------------------------------------
// Round-trips
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn person_roundtrip(ident in person()) {
        let rendered = ident.to_external_bytes();
        prop_assert_eq!(PersonIdent::parse(&rendered).unwrap(), ident);
    }

    #[test]
    fn tree_roundtrip(tree in tree()) {
        prop_assert_eq!(Tree::parse(&tree.serialize()).unwrap(), tree);
    }

    #[test]
    fn commit_roundtrip(
        tree_id in nonzero_id(),
        parents in proptest::collection::vec(nonzero_id(), 0..4),
        author in person(),
        committer in person(),
        message in message(),
    ) {
        let commit = Commit::new(tree_id, parents, author, committer, message).unwrap();
        prop_assert_eq!(Commit::parse(&commit.serialize()).unwrap(), commit);
    }

    #[test]
    fn tag_roundtrip(
        object in nonzero_id(),
        name in "[a-zA-Z0-9][a-zA-Z0-9._/-]{0,20}",
        tagger in proptest::option::of(person()),
        message in message(),
    ) {
        let tag = Tag::new(object, ObjectKind::Commit, name, tagger, message).unwrap();
        prop_assert_eq!(Tag::parse(&tag.serialize()).unwrap(), tag);
    }

    #[test]
    fn serialized_tree_size_is_sum_of_entries(tree in tree()) {
        let expected: usize = tree
            .entries()
            .iter()
            .map(|e| e.mode.as_octal_bytes().len() + 1 + e.name.len() + 1 + 20)
            .sum();
        prop_assert_eq!(tree.serialize().len(), expected);
    }
}
