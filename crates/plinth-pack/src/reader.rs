//! The pack reader: open, look up, enumerate, retrieve.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use plinth_object::{FileContent, Object, ObjectId, ObjectKind};
use sha1::{Digest, Sha1};
use tracing::{debug, instrument};

use crate::error::PackError;
use crate::index::PackIndex;
use crate::varint::read_object_header;

const PACK_HEADER: &[u8; 8] = b"PACK\0\0\0\x02";

/// One indexed object: its id, where its record starts in the pack, and
/// (for v2 indexes) the record's CRC-32.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackEntry {
    /// The object id.
    pub id: ObjectId,
    /// Byte offset of the record in the `.pack` file.
    pub offset: u64,
    /// CRC-32 of the compressed record; `None` for v1 indexes.
    pub crc32: Option<u32>,
}

/// Read-side access to one pack.
///
/// The index is held in memory; the pack file is opened per retrieval and
/// no handle is retained between calls.
#[derive(Debug)]
pub struct PackReader {
    index: PackIndex,
    pack_path: PathBuf,
}

impl PackReader {
    /// Open a pack by its `.pack` and `.idx` paths. The index is read
    /// fully; the pack file is only probed later, per object.
    ///
    /// # Errors
    ///
    /// [`PackError::InvalidIndex`] and I/O errors.
    #[instrument(skip_all, fields(pack = %pack_path.as_ref().display()))]
    pub fn open(
        pack_path: impl AsRef<Path>,
        idx_path: impl AsRef<Path>,
    ) -> Result<Self, PackError> {
        let data = std::fs::read(idx_path.as_ref())?;
        let index = PackIndex::parse(data)?;
        debug!(version = index.version(), objects = index.count(), "opened pack index");
        Ok(Self { index, pack_path: pack_path.as_ref().to_path_buf() })
    }

    /// The parsed index.
    #[must_use]
    pub const fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Number of objects in the pack.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.index.count()
    }

    /// Is `id` present in this pack?
    #[must_use]
    pub fn has_object(&self, id: &ObjectId) -> bool {
        self.index.index_of(id).is_some()
    }

    /// The sorted-table position of `id`, if present.
    #[must_use]
    pub fn index_for_object_id(&self, id: &ObjectId) -> Option<usize> {
        self.index.index_of(id)
    }

    /// The entry at table position `i`.
    ///
    /// # Errors
    ///
    /// [`PackError::InvalidIndex`] when `i` is out of range or the offset
    /// tables are inconsistent.
    pub fn pack_entry_at_index(&self, i: usize) -> Result<PackEntry, PackError> {
        if i >= self.index.count() as usize {
            return Err(PackError::InvalidIndex {
                reason: format!("entry {i} out of range for {} objects", self.index.count()),
            });
        }
        Ok(PackEntry {
            id: self.index.id_at(i),
            offset: self.index.offset_at(i)?,
            crc32: self.index.crc_at(i),
        })
    }

    /// Iterate all entries in index (ascending id) order. Each call
    /// produces a fresh iterator, so enumeration is restartable.
    pub fn entries(&self) -> impl Iterator<Item = Result<PackEntry, PackError>> + '_ {
        (0..self.index.count() as usize).map(|i| self.pack_entry_at_index(i))
    }

    /// Retrieve an object, inflating its record into an unlinked temp file
    /// whose lifetime rides with the returned [`Object`].
    ///
    /// # Errors
    ///
    /// [`PackError::NotFound`], [`PackError::UnsupportedDelta`] for
    /// deltified records, [`PackError::InvalidObject`] on pack corruption,
    /// and I/O errors.
    #[instrument(skip_all, fields(id = %id))]
    pub fn get_object(&self, id: &ObjectId) -> Result<Object, PackError> {
        let position = self.index.index_of(id).ok_or(PackError::NotFound { id: *id })?;
        let offset = self.index.offset_at(position)?;

        let mut pack = File::open(&self.pack_path)?;
        let mut header = [0u8; 8];
        pack.read_exact(&mut header).map_err(bad_pack)?;
        if &header != PACK_HEADER {
            return Err(PackError::InvalidObject {
                reason: "missing PACK v2 header".to_owned(),
            });
        }

        pack.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(pack);
        let (type_code, size) = read_object_header(&mut reader).map_err(bad_pack)?;
        let kind = match type_code {
            1 => ObjectKind::Commit,
            2 => ObjectKind::Tree,
            3 => ObjectKind::Blob,
            4 => ObjectKind::Tag,
            6 => return Err(PackError::UnsupportedDelta { kind: "ofs_delta" }),
            7 => return Err(PackError::UnsupportedDelta { kind: "ref_delta" }),
            other => {
                return Err(PackError::InvalidObject {
                    reason: format!("unknown record type {other}"),
                });
            }
        };

        let content = inflate_to_temp(reader, size)?;
        debug!(kind = %kind, size, "inflated pack record");
        Ok(Object::with_id(kind, *id, content))
    }

    /// Recompute the pack file's trailing SHA-1 and require it to match
    /// both the trailer itself and the copy recorded in the index.
    ///
    /// Returns the verified checksum.
    ///
    /// # Errors
    ///
    /// [`PackError::InvalidObject`] on either mismatch or a pack too
    /// short to carry a trailer; I/O errors.
    #[instrument(skip_all, fields(pack = %self.pack_path.display()))]
    pub fn verify_pack_checksum(&self) -> Result<ObjectId, PackError> {
        let file = File::open(&self.pack_path)?;
        let len = file.metadata()?.len();
        if len < 12 + 20 {
            return Err(PackError::InvalidObject {
                reason: format!("pack is only {len} bytes"),
            });
        }

        let mut reader = BufReader::new(file);
        let mut hasher = Sha1::new();
        let mut remaining = len - 20;
        let mut buf = [0u8; 8192];
        while remaining > 0 {
            let want = usize::try_from(remaining.min(buf.len() as u64)).unwrap_or(buf.len());
            reader.read_exact(&mut buf[..want]).map_err(bad_pack)?;
            hasher.update(&buf[..want]);
            remaining -= want as u64;
        }
        let mut trailer = [0u8; 20];
        reader.read_exact(&mut trailer).map_err(bad_pack)?;

        let actual = ObjectId::from_bytes(hasher.finalize().into());
        if actual.as_bytes() != &trailer {
            return Err(PackError::InvalidObject {
                reason: "pack checksum does not match its trailer".to_owned(),
            });
        }
        if actual != self.index.packfile_sha() {
            return Err(PackError::InvalidObject {
                reason: "pack checksum does not match the index".to_owned(),
            });
        }
        debug!(checksum = %actual, "pack checksum verified");
        Ok(actual)
    }
}

/// Inflate a record into an unlinked temp file, verifying the declared
/// size.
fn inflate_to_temp(reader: impl Read, expected: u64) -> Result<FileContent, PackError> {
    let mut decoder = ZlibDecoder::new(reader);
    let temp = tempfile::NamedTempFile::new()?;
    let (file, temp_path) = temp.into_parts();
    let mut writer = io::BufWriter::new(file);

    // Pull one byte past the declared size so over-long streams are caught.
    let copied = io::copy(&mut decoder.by_ref().take(expected + 1), &mut writer)
        .map_err(bad_pack)?;
    if copied != expected {
        return Err(PackError::InvalidObject {
            reason: format!("record inflated to {copied} bytes, header declared {expected}"),
        });
    }
    writer.flush()?;
    drop(writer);
    Ok(FileContent::from_temp(temp_path, expected))
}

fn bad_pack(err: io::Error) -> PackError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => {
            PackError::InvalidObject { reason: format!("truncated or corrupt pack data: {err}") }
        }
        _ => PackError::Io(err),
    }
}
