//! The parsed `.idx` tables.
//!
//! The whole index file lives in one buffer; every accessor slices into
//! it. Version 2 is recognized by the `\xFF t O c` magic; anything else is
//! read as the headerless version 1 layout.

use plinth_object::ObjectId;

use crate::error::PackError;

const V2_MAGIC: [u8; 4] = [0xFF, b't', b'O', b'c'];
const FANOUT_LEN: usize = 256 * 4;
/// High bit of a v2 small offset: the value indexes the 64-bit table.
const OFFSET_64_FLAG: u32 = 0x8000_0000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    V1 {
        records: usize,
    },
    V2 {
        sha_table: usize,
        crc_table: usize,
        offset_table: usize,
        offset64_table: usize,
        offset64_count: usize,
    },
}

/// A fully parsed pack index.
#[derive(Debug)]
pub struct PackIndex {
    data: Vec<u8>,
    fanout: Box<[u32; 256]>,
    count: u32,
    layout: Layout,
    packfile_sha: ObjectId,
    idxfile_sha: ObjectId,
}

impl PackIndex {
    /// Parse an index file's bytes.
    ///
    /// # Errors
    ///
    /// [`PackError::InvalidIndex`] on version, length, or fanout problems.
    pub fn parse(data: Vec<u8>) -> Result<Self, PackError> {
        if data.len() >= 8 && data[..4] == V2_MAGIC {
            Self::parse_v2(data)
        } else {
            Self::parse_v1(data)
        }
    }

    fn parse_v2(data: Vec<u8>) -> Result<Self, PackError> {
        let version = be_u32(&data, 4)?;
        if version != 2 {
            return Err(invalid(format!("unknown index version {version}")));
        }
        let fanout = read_fanout(&data, 8)?;
        let count = fanout[255] as usize;

        let sha_table = 8 + FANOUT_LEN;
        let crc_table = sha_table + count * 20;
        let offset_table = crc_table + count * 4;
        let offset64_table = offset_table + count * 4;

        // Every small offset with the high bit set points into the 64-bit
        // table; the table's length follows from how many there are.
        let mut offset64_count = 0;
        for i in 0..count {
            if be_u32(&data, offset_table + i * 4)? & OFFSET_64_FLAG != 0 {
                offset64_count += 1;
            }
        }

        let trailer = offset64_table + offset64_count * 8;
        expect_len(&data, trailer + 40)?;
        let packfile_sha = sha_at(&data, trailer);
        let idxfile_sha = sha_at(&data, trailer + 20);

        Ok(Self {
            data,
            fanout: Box::new(fanout),
            count: count as u32,
            layout: Layout::V2 { sha_table, crc_table, offset_table, offset64_table, offset64_count },
            packfile_sha,
            idxfile_sha,
        })
    }

    fn parse_v1(data: Vec<u8>) -> Result<Self, PackError> {
        let fanout = read_fanout(&data, 0)?;
        let count = fanout[255] as usize;
        let records = FANOUT_LEN;
        let trailer = records + count * 24;
        expect_len(&data, trailer + 40)?;
        let packfile_sha = sha_at(&data, trailer);
        let idxfile_sha = sha_at(&data, trailer + 20);

        Ok(Self {
            data,
            fanout: Box::new(fanout),
            count: count as u32,
            layout: Layout::V1 { records },
            packfile_sha,
            idxfile_sha,
        })
    }

    /// 1 or 2.
    #[must_use]
    pub fn version(&self) -> u32 {
        match self.layout {
            Layout::V1 { .. } => 1,
            Layout::V2 { .. } => 2,
        }
    }

    /// Number of objects in the pack.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// The pack file's trailing checksum as recorded in the index.
    #[must_use]
    pub const fn packfile_sha(&self) -> ObjectId {
        self.packfile_sha
    }

    /// The index file's own trailing checksum.
    #[must_use]
    pub const fn idxfile_sha(&self) -> ObjectId {
        self.idxfile_sha
    }

    /// The id of the `i`-th object, in sorted id order.
    ///
    /// # Panics
    ///
    /// If `i` is out of range; callers index within `count()`.
    #[must_use]
    pub fn id_at(&self, i: usize) -> ObjectId {
        let offset = match self.layout {
            Layout::V1 { records } => records + i * 24 + 4,
            Layout::V2 { sha_table, .. } => sha_table + i * 20,
        };
        sha_at(&self.data, offset)
    }

    /// The pack-file byte offset of the `i`-th object.
    ///
    /// # Errors
    ///
    /// [`PackError::InvalidIndex`] when a v2 entry points past the 64-bit
    /// table.
    pub fn offset_at(&self, i: usize) -> Result<u64, PackError> {
        match self.layout {
            Layout::V1 { records } => Ok(u64::from(be_u32(&self.data, records + i * 24)?)),
            Layout::V2 { offset_table, offset64_table, offset64_count, .. } => {
                let small = be_u32(&self.data, offset_table + i * 4)?;
                if small & OFFSET_64_FLAG == 0 {
                    return Ok(u64::from(small));
                }
                let slot = (small & !OFFSET_64_FLAG) as usize;
                if slot >= offset64_count {
                    return Err(invalid(format!("64-bit offset slot {slot} out of range")));
                }
                let at = offset64_table + slot * 8;
                let raw: [u8; 8] = self.data[at..at + 8].try_into().map_err(|_| {
                    invalid("truncated 64-bit offset table".to_owned())
                })?;
                Ok(u64::from_be_bytes(raw))
            }
        }
    }

    /// The CRC-32 of the `i`-th record's compressed bytes (v2 only).
    #[must_use]
    pub fn crc_at(&self, i: usize) -> Option<u32> {
        match self.layout {
            Layout::V1 { .. } => None,
            Layout::V2 { crc_table, .. } => be_u32(&self.data, crc_table + i * 4).ok(),
        }
    }

    /// Find the table position of `id` by scanning its fanout bucket.
    #[must_use]
    pub fn index_of(&self, id: &ObjectId) -> Option<usize> {
        let first = id.first_byte() as usize;
        let start = if first == 0 { 0 } else { self.fanout[first - 1] as usize };
        let end = self.fanout[first] as usize;
        for i in start..end {
            let candidate = self.id_at(i);
            match candidate.cmp(id) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => return Some(i),
                std::cmp::Ordering::Greater => return None,
            }
        }
        None
    }
}

fn invalid(reason: String) -> PackError {
    PackError::InvalidIndex { reason }
}

fn be_u32(data: &[u8], offset: usize) -> Result<u32, PackError> {
    data.get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or_else(|| invalid("unexpected end of index data".to_owned()))
}

fn sha_at(data: &[u8], offset: usize) -> ObjectId {
    let mut raw = [0u8; 20];
    raw.copy_from_slice(&data[offset..offset + 20]);
    ObjectId::from_bytes(raw)
}

fn read_fanout(data: &[u8], at: usize) -> Result<[u32; 256], PackError> {
    let mut fanout = [0u32; 256];
    let mut previous = 0;
    for (i, slot) in fanout.iter_mut().enumerate() {
        let value = be_u32(data, at + i * 4)?;
        if value < previous {
            return Err(invalid(format!("fanout table decreases at byte 0x{i:02x}")));
        }
        previous = value;
        *slot = value;
    }
    Ok(fanout)
}

fn expect_len(data: &[u8], expected: usize) -> Result<(), PackError> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(invalid(format!("index is {} bytes, layout implies {expected}", data.len())))
    }
}
