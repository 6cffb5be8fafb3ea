//! Property and acceptance tests for the directory cache.

use proptest::prelude::*;

use plinth_index::{codec, DirCache, DirCacheEntry, HashingReader, HashingWriter};
use plinth_object::{FileMode, ObjectId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn encode(cache: &DirCache) -> Vec<u8> {
    let mut output = HashingWriter::new(Vec::new());
    codec::write(cache, &mut output).unwrap();
    output.into_inner()
}

fn decode(raw: &[u8]) -> DirCache {
    let mut input = HashingReader::new(raw);
    codec::read(&mut input).unwrap()
}

fn nonzero_id() -> impl Strategy<Value = ObjectId> {
    any::<[u8; 20]>()
        .prop_filter("zero id is reserved", |b| b.iter().any(|&x| x != 0))
        .prop_map(ObjectId::from_bytes)
}

fn blob_mode() -> impl Strategy<Value = FileMode> {
    prop_oneof![
        Just(FileMode::Regular),
        Just(FileMode::Executable),
        Just(FileMode::Symlink),
        Just(FileMode::Gitlink),
    ]
}

/// Single-segment names only: no `/` means no prefix conflicts, so any
/// set of distinct names forms a valid cache.
fn flat_entry() -> impl Strategy<Value = DirCacheEntry> {
    (
        "[a-zA-Z0-9_][a-zA-Z0-9_-]{0,14}",
        blob_mode(),
        nonzero_id(),
        0u8..=3,
        any::<(u32, u32, u32, u32)>(),
        any::<bool>(),
    )
        .prop_map(|(name, mode, id, stage, (size, mtime_s, ino, uid), assume_valid)| {
            let mut entry = DirCacheEntry::new(name, mode, id).with_stage(stage);
            entry.size = size;
            entry.mtime_s = mtime_s;
            entry.ino = ino;
            entry.uid = uid;
            entry.assume_valid = assume_valid;
            entry
        })
}

fn flat_cache() -> impl Strategy<Value = DirCache> {
    proptest::collection::vec(flat_entry(), 0..24).prop_map(|mut entries| {
        entries.sort_by(DirCacheEntry::key_cmp);
        entries.dedup_by(|a, b| a.same_key(b));
        DirCache::empty().add_entries(entries).unwrap()
    })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn codec_roundtrip(cache in flat_cache()) {
        prop_assert_eq!(decode(&encode(&cache)), cache);
    }

    #[test]
    fn add_nothing_is_identity(cache in flat_cache()) {
        let added = cache.add_entries(vec![]).unwrap();
        prop_assert_eq!(&added, &cache);
        added.validate().unwrap();
    }

    #[test]
    fn remove_nothing_is_identity(cache in flat_cache()) {
        let removed = cache.remove_entries(vec![]).unwrap();
        prop_assert_eq!(&removed, &cache);
        removed.validate().unwrap();
    }

    #[test]
    fn add_then_lookup(cache in flat_cache(), id in nonzero_id()) {
        let incoming = DirCacheEntry::new("zz-added-entry", FileMode::Regular, id);
        let added = cache.add_entries(vec![incoming.clone()]).unwrap();
        prop_assert_eq!(added.entry(b"zz-added-entry", 0), Some(&incoming));
        added.validate().unwrap();
    }
}

/// Like [`flat_cache`] but every entry at stage 0, so materialization is
/// always legal.
fn flat_merged_cache() -> impl Strategy<Value = DirCache> {
    proptest::collection::vec(flat_entry(), 0..24).prop_map(|mut entries| {
        for entry in &mut entries {
            entry.stage = 0;
        }
        entries.sort_by(DirCacheEntry::key_cmp);
        entries.dedup_by(|a, b| a.same_key(b));
        DirCache::empty().add_entries(entries).unwrap()
    })
}

proptest! {
    /// For flat caches the materialized root must equal the tree built
    /// directly from the same entries.
    #[test]
    fn flat_materialization_matches_direct_tree(cache in flat_merged_cache()) {
        let (trees, root) = plinth_index::to_tree_objects(&cache, None).unwrap();
        prop_assert_eq!(trees.len(), 1);

        let direct = plinth_object::Tree::from_unsorted(
            cache
                .entries()
                .iter()
                .map(|e| plinth_object::TreeEntry::new(e.name.clone(), e.mode, e.id))
                .collect(),
        )
        .unwrap();
        prop_assert_eq!(direct.to_object().unwrap().id(), root);
    }
}

// ---------------------------------------------------------------------------
// Acceptance: the seeded hello.txt round-trip
// ---------------------------------------------------------------------------

#[test]
fn hello_txt_roundtrip() {
    let entry = DirCacheEntry::new(
        "hello.txt",
        FileMode::Regular,
        "18832d35117ef2f013c4009f5b2128dfaeff354f".parse::<ObjectId>().unwrap(),
    );
    let cache = DirCache::empty().add_entries(vec![entry]).unwrap();
    let raw = encode(&cache);
    let back = decode(&raw);
    assert_eq!(back, cache);
    assert_eq!(back.entries()[0].name, "hello.txt");
    assert_eq!(
        back.entries()[0].id.to_hex(),
        "18832d35117ef2f013c4009f5b2128dfaeff354f"
    );
    assert_eq!(back.entries()[0].stage, 0);
    assert_eq!(back.entries()[0].mode, FileMode::Regular);
}

#[test]
fn file_roundtrip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index");
    let cache = DirCache::empty()
        .add_entries(vec![
            DirCacheEntry::new("a/b", FileMode::Regular, ObjectId::from_bytes([1; 20])),
            DirCacheEntry::new("c", FileMode::Symlink, ObjectId::from_bytes([2; 20])),
        ])
        .unwrap();
    codec::write_to(&cache, &path).unwrap();
    assert_eq!(codec::read_from(&path).unwrap(), cache);
}
