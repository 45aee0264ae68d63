//! dsmrlink wire format — the on-disk and on-wire form of a single chunk.
//!
//! Every field and size here is part of the format. Anything already
//! written with this layout must stay readable, so treat changes as
//! breaking.
//!
//!   offset  size  field
//!        0    16  identifier (raw ULID bytes)
//!       16     2  duration in ms, big-endian
//!       18     2  payload length, big-endian
//!       20     N  payload
//!
//! There is no checksum at this layer. Integrity belongs to whatever
//! carries or stores the encoded bytes.

use std::fmt;
use std::io::{self, Read, Write};

use bytes::Bytes;
use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U16};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

use crate::chunk::Chunk;
use crate::id::{Ulid, ULID_LEN};

// ── Header ────────────────────────────────────────────────────────────────────

/// Fixed-size prefix of every encoded chunk.
///
/// Wire size: 20 bytes. All fields have alignment 1, so the struct has no
/// padding and maps byte-for-byte onto the wire.
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct ChunkHeader {
    /// Raw identifier bytes, timestamp first.
    pub id: [u8; ULID_LEN],

    /// Elapsed capture time in milliseconds.
    pub duration: U16<BigEndian>,

    /// Length of the payload in bytes, not including this header.
    pub length: U16<BigEndian>,
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(ChunkHeader, [u8; 20]);

impl ChunkHeader {
    /// Build the header for a chunk, rejecting payloads the length field
    /// cannot describe.
    pub fn for_chunk(chunk: &Chunk) -> Result<Self, WireError> {
        let length = u16::try_from(chunk.len()).map_err(|_| WireError::PayloadTooLarge(chunk.len()))?;
        Ok(Self {
            id: chunk.id().to_bytes(),
            duration: U16::new(chunk.duration()),
            length: U16::new(length),
        })
    }

    /// Read a header from the front of `bytes`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        Self::read_from_prefix(bytes)
    }

    pub fn payload_len(&self) -> usize {
        usize::from(self.length.get())
    }
}

// ── Constants ─────────────────────────────────────────────────────────────────

/// Encoded header size in bytes.
pub const HEADER_LEN: usize = 20;

/// Maximum payload size in bytes, bounded by the 16-bit length field.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encode a chunk into a freshly allocated buffer of `20 + len` bytes.
pub fn encode(chunk: &Chunk) -> Result<Vec<u8>, WireError> {
    let header = ChunkHeader::for_chunk(chunk)?;
    let mut buf = Vec::with_capacity(HEADER_LEN + chunk.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(chunk.data());
    Ok(buf)
}

/// Encode a chunk straight into a writer.
pub fn write_chunk<W: Write + ?Sized>(dst: &mut W, chunk: &Chunk) -> Result<(), WireError> {
    let header = ChunkHeader::for_chunk(chunk)?;
    dst.write_all(header.as_bytes())?;
    dst.write_all(chunk.data())?;
    Ok(())
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Read one chunk from a blocking source.
///
/// Returns `Ok(None)` when the source is exhausted before the first header
/// byte. Running dry anywhere after that is `WireError::Truncated`. Other
/// I/O errors are returned as they occur; only `Interrupted` is retried.
pub fn read_chunk<R: Read + ?Sized>(src: &mut R) -> Result<Option<Chunk>, WireError> {
    let mut raw = [0u8; HEADER_LEN];
    match read_full(src, &mut raw)? {
        0 => return Ok(None),
        n if n < HEADER_LEN => {
            return Err(WireError::Truncated {
                section: Section::Header,
                expected: HEADER_LEN,
                received: n,
            })
        }
        _ => {}
    }
    let header = ChunkHeader::parse(&raw).ok_or(WireError::Truncated {
        section: Section::Header,
        expected: HEADER_LEN,
        received: raw.len(),
    })?;

    let expected = header.payload_len();
    let mut data = vec![0u8; expected];
    let received = read_full(src, &mut data)?;
    if received < expected {
        return Err(WireError::Truncated {
            section: Section::Payload,
            expected,
            received,
        });
    }

    Ok(Some(Chunk::new(
        Ulid::from_bytes(header.id),
        header.duration.get(),
        Bytes::from(data),
    )))
}

/// Decode one chunk from the front of `bytes`, returning it together with
/// the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> Result<(Chunk, usize), WireError> {
    let header = ChunkHeader::parse(bytes).ok_or(WireError::Truncated {
        section: Section::Header,
        expected: HEADER_LEN,
        received: bytes.len(),
    })?;

    let expected = header.payload_len();
    let payload = &bytes[HEADER_LEN..];
    if payload.len() < expected {
        return Err(WireError::Truncated {
            section: Section::Payload,
            expected,
            received: payload.len(),
        });
    }

    let chunk = Chunk::new(
        Ulid::from_bytes(header.id),
        header.duration.get(),
        Bytes::copy_from_slice(&payload[..expected]),
    );
    Ok((chunk, HEADER_LEN + expected))
}

/// Fill `buf` from `src`, stopping early only at end of input.
/// Returns how many bytes were read.
fn read_full<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> Result<usize, WireError> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(WireError::Io(e)),
        }
    }
    Ok(filled)
}

/// Iterates over consecutive encoded chunks in a byte source.
///
/// Ends cleanly at end of input. After the first error it yields nothing
/// further, since the stream position is no longer trustworthy.
pub struct ChunkReader<R> {
    inner: R,
    failed: bool,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            failed: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Iterator for ChunkReader<R> {
    type Item = Result<Chunk, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match read_chunk(&mut self.inner) {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Which part of an encoded chunk a truncation hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Payload,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Header => f.write_str("header"),
            Section::Payload => f.write_str("payload"),
        }
    }
}

/// Errors that can arise when encoding or decoding chunks.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("payload length {0} exceeds maximum {}", MAX_PAYLOAD)]
    PayloadTooLarge(usize),

    #[error("truncated {section}: expected {expected} bytes, got {received}")]
    Truncated {
        section: Section,
        expected: usize,
        received: usize,
    },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
