//! The binary v2 (`DIRC`) index codec.
//!
//! Layout: a 12-byte header, `entry_count` entries (each a 62-byte fixed
//! block, the name, and 1..=8 NUL pad bytes aligning the entry to 8),
//! any number of extensions, and a 20-byte SHA-1 trailer. The trailer is
//! owned by the [`hashio`](crate::hashio) wrappers — both entry points
//! refuse streams without the trailing-hash capability.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use bstr::{BString, ByteSlice};
use plinth_object::{FileMode, ObjectId};
use tracing::{debug, instrument, warn};

use crate::cache::{DirCache, VERSION};
use crate::entry::{
    DirCacheEntry, FLAG_ASSUME_VALID, FLAG_EXTENDED, NAME_LENGTH_MASK, STAGE_SHIFT,
};
use crate::error::IndexError;
use crate::hashio::{HashingReader, HashingWriter, TrailerError, TrailingHashInput, TrailingHashOutput};
use crate::MAX_ENTRIES;

const SIGNATURE: &[u8; 4] = b"DIRC";
/// Fixed-size prefix of every entry: ten stat words, the id, the flags.
const ENTRY_FIXED_LEN: usize = 62;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Parse an index from a trailing-hash stream.
///
/// # Errors
///
/// [`IndexError::NotShaHashDevice`] for a plain stream, the full codec
/// error set otherwise.
pub fn read(input: &mut impl TrailingHashInput) -> Result<DirCache, IndexError> {
    if !input.sha_capable() {
        return Err(IndexError::NotShaHashDevice);
    }

    let mut header = [0u8; 12];
    input.read_exact(&mut header).map_err(truncated)?;
    if &header[..4] != SIGNATURE {
        return Err(IndexError::InvalidDirCache {
            reason: "missing DIRC signature".to_owned(),
        });
    }
    let version = u32::from_be_bytes(header[4..8].try_into().expect("4 bytes"));
    if version != VERSION {
        return Err(IndexError::UnsupportedVersion { version });
    }
    let count = u32::from_be_bytes(header[8..12].try_into().expect("4 bytes"));
    if count > MAX_ENTRIES {
        return Err(IndexError::TooManyEntries { count });
    }

    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        entries.push(read_entry(input)?);
    }

    skip_extensions(input)?;

    match input.verify_trailer() {
        Ok(()) => {}
        Err(TrailerError::Mismatch) => return Err(IndexError::ShaHashMismatch),
        Err(TrailerError::Truncated) => {
            return Err(IndexError::InvalidDirCache {
                reason: "stream ended inside the trailing hash".to_owned(),
            });
        }
        Err(TrailerError::NotHashing) => return Err(IndexError::NotShaHashDevice),
    }

    let cache = DirCache::from_parts(version, entries);
    cache.validate()?;
    Ok(cache)
}

fn read_entry(input: &mut impl TrailingHashInput) -> Result<DirCacheEntry, IndexError> {
    let mut fixed = [0u8; ENTRY_FIXED_LEN];
    input.read_exact(&mut fixed).map_err(truncated)?;

    let word = |i: usize| u32::from_be_bytes(fixed[i * 4..i * 4 + 4].try_into().expect("4 bytes"));
    let id = ObjectId::try_from_bytes(&fixed[40..60])?;
    let flags = u16::from_be_bytes(fixed[60..62].try_into().expect("2 bytes"));

    if flags & FLAG_EXTENDED != 0 {
        return Err(IndexError::InvalidDirCache {
            reason: "extended entry flags in a version 2 index".to_owned(),
        });
    }

    let (name, pad_already_consumed) = read_entry_name(input, flags & NAME_LENGTH_MASK)?;
    if id.is_zero() {
        return Err(IndexError::InvalidEntry {
            name: name.clone(),
            reason: "zero object id".to_owned(),
        });
    }
    let mode_bits = word(6);
    let mode = FileMode::from_bits(mode_bits).map_err(|_| IndexError::InvalidEntry {
        name: name.clone(),
        reason: format!("unknown mode {mode_bits:o}"),
    })?;

    consume_padding(input, name.len(), pad_already_consumed)?;

    #[allow(clippy::cast_possible_truncation)]
    let stage = ((flags >> STAGE_SHIFT) & 0x3) as u8;
    Ok(DirCacheEntry {
        name,
        stage,
        id,
        mode,
        size: word(9),
        ctime_s: word(0),
        ctime_ns: word(1),
        mtime_s: word(2),
        mtime_ns: word(3),
        dev: word(4),
        ino: word(5),
        uid: word(7),
        gid: word(8),
        assume_valid: flags & FLAG_ASSUME_VALID != 0,
        extended: false,
        skip_worktree: false,
        intent_to_add: false,
    })
}

/// Read the entry name. A stored length below 0xFFF is exact; 0xFFF means
/// "scan to the NUL", in which case the NUL doubles as the first pad byte.
fn read_entry_name(
    input: &mut impl TrailingHashInput,
    stored_len: u16,
) -> Result<(BString, usize), IndexError> {
    if stored_len < NAME_LENGTH_MASK {
        let mut name = vec![0u8; usize::from(stored_len)];
        input.read_exact(&mut name).map_err(truncated)?;
        if name.contains(&0) {
            return Err(IndexError::InvalidDirCache {
                reason: "NUL inside entry name".to_owned(),
            });
        }
        Ok((name.into(), 0))
    } else {
        let mut name = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            input.read_exact(&mut byte).map_err(truncated)?;
            if byte[0] == 0 {
                break;
            }
            name.push(byte[0]);
        }
        if name.len() < usize::from(NAME_LENGTH_MASK) {
            return Err(IndexError::InvalidDirCache {
                reason: "over-length name marker on a short name".to_owned(),
            });
        }
        Ok((name.into(), 1))
    }
}

/// Entries pad with NULs so `62 + name_len + pad` is a multiple of 8,
/// with at least one pad byte.
fn padded_len(name_len: usize) -> usize {
    (ENTRY_FIXED_LEN + name_len + 8) & !7
}

fn consume_padding(
    input: &mut impl TrailingHashInput,
    name_len: usize,
    already_consumed: usize,
) -> Result<(), IndexError> {
    let pad = padded_len(name_len) - ENTRY_FIXED_LEN - name_len - already_consumed;
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf[..pad]).map_err(truncated)?;
    if buf[..pad].iter().any(|&b| b != 0) {
        return Err(IndexError::InvalidDirCache {
            reason: "non-NUL entry padding".to_owned(),
        });
    }
    Ok(())
}

/// Extensions sit between the entries and the trailer. An uppercase first
/// signature byte marks an optional extension, which is skipped; anything
/// else is mandatory and unsupported.
fn skip_extensions(input: &mut impl TrailingHashInput) -> Result<(), IndexError> {
    loop {
        let mut header = [0u8; 8];
        match fill_or_eof(input, &mut header)? {
            0 => return Ok(()),
            8 => {}
            _ => {
                return Err(IndexError::InvalidDirCache {
                    reason: "truncated extension header".to_owned(),
                });
            }
        }
        let signature = &header[..4];
        let length = u64::from(u32::from_be_bytes(header[4..8].try_into().expect("4 bytes")));
        if !signature[0].is_ascii_uppercase() {
            return Err(IndexError::UnsupportedExtension { signature: signature.into() });
        }
        warn!(
            signature = %signature.as_bstr(),
            length,
            "skipping optional index extension"
        );
        let skipped = io::copy(&mut input.by_ref().take(length), &mut io::sink())?;
        if skipped != length {
            return Err(IndexError::InvalidDirCache {
                reason: "truncated extension body".to_owned(),
            });
        }
    }
}

/// Fill `buf` as far as the stream allows; 0 means clean EOF.
fn fill_or_eof(input: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

fn truncated(err: io::Error) -> IndexError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        IndexError::InvalidDirCache { reason: "unexpected end of index data".to_owned() }
    } else {
        IndexError::Io(err)
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Serialize a validated cache to a trailing-hash stream, including the
/// final digest.
///
/// # Errors
///
/// [`IndexError::NotShaHashDevice`] for a plain stream, validation errors
/// from the cache, [`IndexError::TooManyEntries`], and I/O errors.
pub fn write(cache: &DirCache, output: &mut impl TrailingHashOutput) -> Result<(), IndexError> {
    if !output.sha_capable() {
        return Err(IndexError::NotShaHashDevice);
    }
    cache.validate()?;
    let count = u32::try_from(cache.len())
        .map_err(|_| IndexError::TooManyEntries { count: u32::MAX })?;
    if count > MAX_ENTRIES {
        return Err(IndexError::TooManyEntries { count });
    }

    output.write_all(SIGNATURE)?;
    output.write_all(&cache.version().to_be_bytes())?;
    output.write_all(&count.to_be_bytes())?;

    for entry in cache.entries() {
        write_entry(output, entry)?;
    }

    output.finish()?;
    Ok(())
}

fn write_entry(output: &mut impl TrailingHashOutput, entry: &DirCacheEntry) -> io::Result<()> {
    for word in [
        entry.ctime_s,
        entry.ctime_ns,
        entry.mtime_s,
        entry.mtime_ns,
        entry.dev,
        entry.ino,
        entry.mode.bits(),
        entry.uid,
        entry.gid,
        entry.size,
    ] {
        output.write_all(&word.to_be_bytes())?;
    }
    output.write_all(entry.id.as_bytes())?;
    output.write_all(&entry.flags_word().to_be_bytes())?;
    output.write_all(&entry.name)?;

    let pad = padded_len(entry.name.len()) - ENTRY_FIXED_LEN - entry.name.len();
    output.write_all(&[0u8; 8][..pad])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// File convenience
// ---------------------------------------------------------------------------

/// Read an index file.
///
/// # Errors
///
/// The full codec error set plus I/O.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_from(path: &Path) -> Result<DirCache, IndexError> {
    let file = File::open(path)?;
    let mut input = HashingReader::new(BufReader::new(file));
    let cache = read(&mut input)?;
    debug!(entries = cache.len(), "read index");
    Ok(cache)
}

/// Write an index file atomically: a temp file in the same directory is
/// renamed over the target only after the trailer is on disk.
///
/// # Errors
///
/// The full codec error set plus I/O.
#[instrument(skip_all, fields(path = %path.display(), entries = cache.len()))]
pub fn write_to(cache: &DirCache, path: &Path) -> Result<(), IndexError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut output = HashingWriter::new(BufWriter::new(&mut temp));
        write(cache, &mut output)?;
    }
    temp.persist(path).map_err(|e| IndexError::Io(e.error))?;
    debug!("wrote index");
    Ok(())
}
