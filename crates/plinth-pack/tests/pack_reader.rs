//! Pack reader tests over synthesized pack and index fixtures.

use std::io::Write;
use std::path::PathBuf;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};
use tempfile::TempDir;

use plinth_object::{ObjectId, ObjectKind};
use plinth_pack::varint::encode_object_header;
use plinth_pack::{PackError, PackReader};

// ---------------------------------------------------------------------------
// Fixture builders
// ---------------------------------------------------------------------------

struct FixtureObject {
    type_code: u8,
    content: Vec<u8>,
}

impl FixtureObject {
    fn blob(content: &[u8]) -> Self {
        Self { type_code: 3, content: content.to_vec() }
    }

    fn id(&self) -> ObjectId {
        let kind = match self.type_code {
            1 => "commit",
            2 => "tree",
            4 => "tag",
            _ => "blob",
        };
        let mut hasher = Sha1::new();
        hasher.update(kind.as_bytes());
        hasher.update(b" ");
        hasher.update(self.content.len().to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(&self.content);
        ObjectId::from_bytes(hasher.finalize().into())
    }
}

fn deflate(content: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

/// Build the `.pack` bytes and the offset of each object's record.
fn build_pack(objects: &[FixtureObject]) -> (Vec<u8>, Vec<u64>) {
    let mut pack = b"PACK".to_vec();
    pack.extend_from_slice(&2u32.to_be_bytes());
    pack.extend_from_slice(&u32::try_from(objects.len()).unwrap().to_be_bytes());

    let mut offsets = Vec::new();
    for object in objects {
        offsets.push(pack.len() as u64);
        pack.extend_from_slice(&encode_object_header(
            object.type_code,
            object.content.len() as u64,
        ));
        pack.extend_from_slice(&deflate(&object.content));
    }
    let trailer: [u8; 20] = Sha1::digest(&pack).into();
    pack.extend_from_slice(&trailer);
    (pack, offsets)
}

/// Ids with their pack offsets, sorted by id, as the index wants them.
fn sorted_entries(objects: &[FixtureObject], offsets: &[u64]) -> Vec<(ObjectId, u64)> {
    let mut entries: Vec<_> =
        objects.iter().zip(offsets).map(|(o, &off)| (o.id(), off)).collect();
    entries.sort_by_key(|(id, _)| *id);
    entries
}

fn fanout_for(entries: &[(ObjectId, u64)]) -> Vec<u8> {
    let mut fanout = Vec::with_capacity(1024);
    for byte in 0u16..=255 {
        let count = entries.iter().filter(|(id, _)| u16::from(id.first_byte()) <= byte).count();
        fanout.extend_from_slice(&u32::try_from(count).unwrap().to_be_bytes());
    }
    fanout
}

fn build_idx_v2(entries: &[(ObjectId, u64)], pack_sha: &[u8; 20], force_64bit: bool) -> Vec<u8> {
    let mut idx = vec![0xFF, b't', b'O', b'c'];
    idx.extend_from_slice(&2u32.to_be_bytes());
    idx.extend_from_slice(&fanout_for(entries));
    for (id, _) in entries {
        idx.extend_from_slice(id.as_bytes());
    }
    for _ in entries {
        idx.extend_from_slice(&0u32.to_be_bytes());
    }
    let mut large = Vec::new();
    for (_, offset) in entries {
        if force_64bit {
            let slot = u32::try_from(large.len() / 8).unwrap();
            idx.extend_from_slice(&(0x8000_0000 | slot).to_be_bytes());
            large.extend_from_slice(&offset.to_be_bytes());
        } else {
            idx.extend_from_slice(&u32::try_from(*offset).unwrap().to_be_bytes());
        }
    }
    idx.extend_from_slice(&large);
    idx.extend_from_slice(pack_sha);
    let own: [u8; 20] = Sha1::digest(&idx).into();
    idx.extend_from_slice(&own);
    idx
}

fn build_idx_v1(entries: &[(ObjectId, u64)], pack_sha: &[u8; 20]) -> Vec<u8> {
    let mut idx = fanout_for(entries);
    for (id, offset) in entries {
        idx.extend_from_slice(&u32::try_from(*offset).unwrap().to_be_bytes());
        idx.extend_from_slice(id.as_bytes());
    }
    idx.extend_from_slice(pack_sha);
    let own: [u8; 20] = Sha1::digest(&idx).into();
    idx.extend_from_slice(&own);
    idx
}

struct Fixture {
    _dir: TempDir,
    pack_path: PathBuf,
    idx_path: PathBuf,
    sorted_ids: Vec<ObjectId>,
}

fn write_fixture(objects: &[FixtureObject], idx_version: u32, force_64bit: bool) -> Fixture {
    let (pack, offsets) = build_pack(objects);
    let entries = sorted_entries(objects, &offsets);
    let pack_sha: [u8; 20] = pack[pack.len() - 20..].try_into().unwrap();
    let idx = match idx_version {
        1 => build_idx_v1(&entries, &pack_sha),
        _ => build_idx_v2(&entries, &pack_sha, force_64bit),
    };

    let dir = TempDir::new().unwrap();
    let pack_path = dir.path().join("test.pack");
    let idx_path = dir.path().join("test.idx");
    std::fs::write(&pack_path, pack).unwrap();
    std::fs::write(&idx_path, idx).unwrap();
    Fixture {
        _dir: dir,
        pack_path,
        idx_path,
        sorted_ids: entries.into_iter().map(|(id, _)| id).collect(),
    }
}

fn three_blobs() -> Vec<FixtureObject> {
    vec![
        FixtureObject::blob(b"first object\n"),
        FixtureObject::blob(b"second, somewhat longer object body\n"),
        FixtureObject::blob(b"third\n"),
    ]
}

fn open(fixture: &Fixture) -> PackReader {
    PackReader::open(&fixture.pack_path, &fixture.idx_path).unwrap()
}

// ---------------------------------------------------------------------------
// Lookup and enumeration
// ---------------------------------------------------------------------------

#[test]
fn v2_lookup_hits_and_misses() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let reader = open(&fixture);
    assert_eq!(reader.count(), 3);
    assert_eq!(reader.index().version(), 2);

    for id in &fixture.sorted_ids {
        assert!(reader.has_object(id), "expected {id} present");
        assert!(reader.index_for_object_id(id).is_some());
    }
    let absent = ObjectId::from_bytes([0x5A; 20]);
    assert!(!reader.has_object(&absent));
    assert!(reader.index_for_object_id(&absent).is_none());
}

#[test]
fn enumeration_is_ascending_and_restartable() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let reader = open(&fixture);

    let first: Vec<_> = reader.entries().collect::<Result<_, _>>().unwrap();
    assert_eq!(first.len(), 3);
    let ids: Vec<_> = first.iter().map(|e| e.id).collect();
    assert_eq!(ids, fixture.sorted_ids);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    // v2 carries CRCs.
    assert!(first.iter().all(|e| e.crc32.is_some()));

    // A second pass starts over.
    let second: Vec<_> = reader.entries().collect::<Result<_, _>>().unwrap();
    assert_eq!(second, first);
}

#[test]
fn v1_layout_parses_and_looks_up() {
    let fixture = write_fixture(&three_blobs(), 1, false);
    let reader = open(&fixture);
    assert_eq!(reader.index().version(), 1);
    assert_eq!(reader.count(), 3);
    for id in &fixture.sorted_ids {
        assert!(reader.has_object(id));
    }
    let entry = reader.pack_entry_at_index(0).unwrap();
    assert_eq!(entry.crc32, None);
    assert_eq!(entry.id, fixture.sorted_ids[0]);
}

#[test]
fn entry_index_out_of_range() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let reader = open(&fixture);
    assert!(matches!(
        reader.pack_entry_at_index(3),
        Err(PackError::InvalidIndex { .. })
    ));
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

#[test]
fn get_object_inflates_content() {
    let objects = three_blobs();
    let fixture = write_fixture(&objects, 2, false);
    let reader = open(&fixture);

    for object in &objects {
        let retrieved = reader.get_object(&object.id()).unwrap();
        assert_eq!(retrieved.kind(), ObjectKind::Blob);
        assert_eq!(retrieved.id(), object.id());
        assert_eq!(retrieved.size(), object.content.len() as u64);
        assert_eq!(retrieved.data().unwrap(), object.content);
        // Trusted id matches the content that came out.
        assert!(retrieved.verify_id().unwrap());
    }
}

#[test]
fn get_object_through_v1_index() {
    let objects = three_blobs();
    let fixture = write_fixture(&objects, 1, false);
    let reader = open(&fixture);
    let retrieved = reader.get_object(&objects[1].id()).unwrap();
    assert_eq!(retrieved.data().unwrap(), objects[1].content);
}

#[test]
fn get_object_resolves_64bit_offsets() {
    let objects = three_blobs();
    let fixture = write_fixture(&objects, 2, true);
    let reader = open(&fixture);
    for object in &objects {
        let retrieved = reader.get_object(&object.id()).unwrap();
        assert_eq!(retrieved.data().unwrap(), object.content);
    }
}

#[test]
fn get_object_missing_is_not_found() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let reader = open(&fixture);
    let absent = ObjectId::from_bytes([0x5A; 20]);
    assert!(matches!(
        reader.get_object(&absent),
        Err(PackError::NotFound { .. })
    ));
}

#[test]
fn typed_records_map_to_kinds() {
    // The reader maps type codes without parsing record contents.
    let objects = vec![
        FixtureObject { type_code: 1, content: b"commit body".to_vec() },
        FixtureObject { type_code: 2, content: b"tree body".to_vec() },
        FixtureObject { type_code: 4, content: b"tag body".to_vec() },
    ];
    let fixture = write_fixture(&objects, 2, false);
    let reader = open(&fixture);
    assert_eq!(reader.get_object(&objects[0].id()).unwrap().kind(), ObjectKind::Commit);
    assert_eq!(reader.get_object(&objects[1].id()).unwrap().kind(), ObjectKind::Tree);
    assert_eq!(reader.get_object(&objects[2].id()).unwrap().kind(), ObjectKind::Tag);
}

#[test]
fn delta_records_fail_cleanly() {
    let objects = vec![
        FixtureObject::blob(b"base\n"),
        FixtureObject { type_code: 6, content: b"delta bytes".to_vec() },
        FixtureObject { type_code: 7, content: b"delta bytes".to_vec() },
    ];
    let fixture = write_fixture(&objects, 2, false);
    let reader = open(&fixture);
    assert!(matches!(
        reader.get_object(&objects[1].id()),
        Err(PackError::UnsupportedDelta { kind: "ofs_delta" })
    ));
    assert!(matches!(
        reader.get_object(&objects[2].id()),
        Err(PackError::UnsupportedDelta { kind: "ref_delta" })
    ));
}

// ---------------------------------------------------------------------------
// Checksums
// ---------------------------------------------------------------------------

#[test]
fn pack_checksum_verifies() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let reader = open(&fixture);
    let checksum = reader.verify_pack_checksum().unwrap();
    assert_eq!(checksum, reader.index().packfile_sha());
}

#[test]
fn pack_checksum_catches_corruption() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let mut pack = std::fs::read(&fixture.pack_path).unwrap();
    let mid = pack.len() / 2;
    pack[mid] ^= 0x01;
    std::fs::write(&fixture.pack_path, pack).unwrap();
    let reader = open(&fixture);
    assert!(matches!(
        reader.verify_pack_checksum(),
        Err(PackError::InvalidObject { .. })
    ));
}

#[test]
fn index_records_both_checksums() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let reader = open(&fixture);
    let idx = std::fs::read(&fixture.idx_path).unwrap();
    // The index's own trailing 20 bytes are its recorded checksum.
    assert_eq!(reader.index().idxfile_sha().as_bytes(), &idx[idx.len() - 20..]);
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn decreasing_fanout_is_rejected() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let mut idx = std::fs::read(&fixture.idx_path).unwrap();
    // Blow up the first fanout slot; every later slot is now smaller.
    idx[8..12].copy_from_slice(&u32::MAX.to_be_bytes());
    std::fs::write(&fixture.idx_path, idx).unwrap();
    assert!(matches!(
        PackReader::open(&fixture.pack_path, &fixture.idx_path),
        Err(PackError::InvalidIndex { .. })
    ));
}

#[test]
fn wrong_idx_length_is_rejected() {
    let fixture = write_fixture(&three_blobs(), 2, false);
    let mut idx = std::fs::read(&fixture.idx_path).unwrap();
    idx.extend_from_slice(b"junk");
    std::fs::write(&fixture.idx_path, idx).unwrap();
    assert!(matches!(
        PackReader::open(&fixture.pack_path, &fixture.idx_path),
        Err(PackError::InvalidIndex { .. })
    ));
}

#[test]
fn bad_pack_magic_is_rejected() {
    let objects = three_blobs();
    let fixture = write_fixture(&objects, 2, false);
    let mut pack = std::fs::read(&fixture.pack_path).unwrap();
    pack[0] = b'X';
    std::fs::write(&fixture.pack_path, pack).unwrap();
    let reader = open(&fixture);
    assert!(matches!(
        reader.get_object(&objects[0].id()),
        Err(PackError::InvalidObject { .. })
    ));
}

#[test]
fn wrong_pack_version_is_rejected() {
    let objects = three_blobs();
    let fixture = write_fixture(&objects, 2, false);
    let mut pack = std::fs::read(&fixture.pack_path).unwrap();
    pack[7] = 3;
    std::fs::write(&fixture.pack_path, pack).unwrap();
    let reader = open(&fixture);
    assert!(matches!(
        reader.get_object(&objects[0].id()),
        Err(PackError::InvalidObject { .. })
    ));
}

#[test]
fn corrupt_record_is_rejected() {
    let objects = three_blobs();
    let (pack, offsets) = build_pack(&objects);
    let entries = sorted_entries(&objects, &offsets);
    let pack_sha: [u8; 20] = pack[pack.len() - 20..].try_into().unwrap();
    let idx = build_idx_v2(&entries, &pack_sha, false);

    // Scramble the compressed bytes of the first record.
    let mut broken = pack;
    let at = usize::try_from(offsets[0]).unwrap() + 3;
    broken[at] ^= 0xFF;
    broken[at + 1] ^= 0xFF;

    let dir = TempDir::new().unwrap();
    let pack_path = dir.path().join("broken.pack");
    let idx_path = dir.path().join("broken.idx");
    std::fs::write(&pack_path, broken).unwrap();
    std::fs::write(&idx_path, idx).unwrap();

    let reader = PackReader::open(&pack_path, &idx_path).unwrap();
    assert!(reader.get_object(&objects[0].id()).is_err());
}
