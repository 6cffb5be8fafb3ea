//! Trailing-hash streams.
//!
//! The index file ends with the SHA-1 of everything before it. These
//! wrappers keep that framing out of the codec: a [`HashingReader`] yields
//! the content while withholding the final 20 bytes, then verifies them;
//! a [`HashingWriter`] hashes what it writes and appends the digest on
//! [`finish`](TrailingHashOutput::finish).
//!
//! The codec only talks to streams through [`TrailingHashInput`] /
//! [`TrailingHashOutput`], whose `sha_capable` probe is how a plain stream
//! is told apart and rejected.

use std::io::{self, Read, Write};

use sha1::{Digest, Sha1};

/// How a trailing-hash check can fail.
#[derive(Debug, PartialEq, Eq)]
pub enum TrailerError {
    /// The stream ended before a full 20-byte trailer.
    Truncated,
    /// The trailer did not match the running hash.
    Mismatch,
    /// The stream has no trailing-hash capability.
    NotHashing,
}

/// A readable stream that may carry the trailing-hash capability.
pub trait TrailingHashInput: Read {
    /// Capability bit: true when this stream withholds and can verify a
    /// trailing SHA-1.
    fn sha_capable(&self) -> bool;

    /// After the content has been read to EOF, check the withheld trailer
    /// against the running hash.
    ///
    /// # Errors
    ///
    /// [`TrailerError`].
    fn verify_trailer(&mut self) -> Result<(), TrailerError>;
}

/// A writable stream that may carry the trailing-hash capability.
pub trait TrailingHashOutput: Write {
    /// Capability bit, as for [`TrailingHashInput`].
    fn sha_capable(&self) -> bool;

    /// Append the 20-byte digest of everything written and flush.
    ///
    /// # Errors
    ///
    /// I/O errors from the underlying stream.
    fn finish(&mut self) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// HashingReader
// ---------------------------------------------------------------------------

/// Reads all of an inner stream except its last 20 bytes, hashing what it
/// yields; the withheld tail is checked by `verify_trailer`.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha1,
    pending: Vec<u8>,
    inner_eof: bool,
}

impl<R: Read> HashingReader<R> {
    /// Wrap a stream whose last 20 bytes are a SHA-1 trailer.
    pub fn new(inner: R) -> Self {
        Self { inner, hasher: Sha1::new(), pending: Vec::new(), inner_eof: false }
    }

    fn fill_pending(&mut self) -> io::Result<()> {
        let mut scratch = [0u8; 8192];
        let n = self.inner.read(&mut scratch)?;
        if n == 0 {
            self.inner_eof = true;
        } else {
            self.pending.extend_from_slice(&scratch[..n]);
        }
        Ok(())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            if self.pending.len() > 20 {
                let available = self.pending.len() - 20;
                let n = out.len().min(available);
                out[..n].copy_from_slice(&self.pending[..n]);
                self.hasher.update(&self.pending[..n]);
                self.pending.drain(..n);
                return Ok(n);
            }
            if self.inner_eof {
                return Ok(0);
            }
            self.fill_pending()?;
        }
    }
}

impl<R: Read> TrailingHashInput for HashingReader<R> {
    fn sha_capable(&self) -> bool {
        true
    }

    fn verify_trailer(&mut self) -> Result<(), TrailerError> {
        // Make sure the inner stream really is drained; a caller that
        // stopped early would otherwise verify against a partial hash.
        while !self.inner_eof {
            if self.fill_pending().is_err() {
                return Err(TrailerError::Truncated);
            }
            if self.pending.len() > 20 {
                let release = self.pending.len() - 20;
                self.hasher.update(&self.pending[..release]);
                self.pending.drain(..release);
            }
        }
        if self.pending.len() != 20 {
            return Err(TrailerError::Truncated);
        }
        let actual: [u8; 20] = self.hasher.clone().finalize().into();
        if actual[..] == self.pending[..] {
            Ok(())
        } else {
            Err(TrailerError::Mismatch)
        }
    }
}

// ---------------------------------------------------------------------------
// HashingWriter
// ---------------------------------------------------------------------------

/// Hashes everything written through it; `finish` appends the digest.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha1,
}

impl<W: Write> HashingWriter<W> {
    /// Wrap a sink that should end with a SHA-1 trailer.
    pub fn new(inner: W) -> Self {
        Self { inner, hasher: Sha1::new() }
    }

    /// Give back the inner sink (after `finish`, for persist-style flows).
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write_all(buf)?;
        self.hasher.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> TrailingHashOutput for HashingWriter<W> {
    fn sha_capable(&self) -> bool {
        true
    }

    fn finish(&mut self) -> io::Result<()> {
        let digest: [u8; 20] = self.hasher.clone().finalize().into();
        self.inner.write_all(&digest)?;
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Plain streams (no capability)
// ---------------------------------------------------------------------------

/// A reader without the trailing-hash capability. Exists so the codec's
/// capability check has something concrete to reject.
pub struct PlainInput<R>(pub R);

impl<R: Read> Read for PlainInput<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.0.read(out)
    }
}

impl<R: Read> TrailingHashInput for PlainInput<R> {
    fn sha_capable(&self) -> bool {
        false
    }

    fn verify_trailer(&mut self) -> Result<(), TrailerError> {
        Err(TrailerError::NotHashing)
    }
}

/// A writer without the trailing-hash capability.
pub struct PlainOutput<W>(pub W);

impl<W: Write> Write for PlainOutput<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<W: Write> TrailingHashOutput for PlainOutput<W> {
    fn sha_capable(&self) -> bool {
        false
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}
