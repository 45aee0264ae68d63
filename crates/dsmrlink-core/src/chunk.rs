//! Chunks — the unit of capture and reassembly.
//!
//! A chunk is whatever a single read from the meter produced, stamped with a
//! `Ulid` and the time the read took. Chunks never change after
//! construction; merging produces a new chunk with its own identity.

use bytes::{Bytes, BytesMut};
use rand::RngCore;

use crate::id::{IdError, IdGenerator, Ulid};

/// An immutable, identified fragment of a telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    id: Ulid,
    duration: u16,
    data: Bytes,
}

impl Chunk {
    pub fn new(id: Ulid, duration: u16, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            duration,
            data: data.into(),
        }
    }

    /// Stamp a freshly captured payload with a new identifier.
    pub fn capture<R: RngCore>(
        ids: &mut IdGenerator<R>,
        duration: u16,
        data: impl Into<Bytes>,
    ) -> Result<Self, IdError> {
        Ok(Self::new(ids.generate()?, duration, data))
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Elapsed capture time in milliseconds.
    pub fn duration(&self) -> u16 {
        self.duration
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.id.timestamp_ms()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fold this chunk and its peers into one.
    ///
    /// The inputs are ordered by identifier and their payloads concatenated
    /// in that order. The result takes the smallest identifier. Its duration
    /// spans from the first chunk's timestamp to the end of the last chunk:
    /// `ts(last) - ts(first) + duration(last)`, clamped to `u16::MAX`.
    ///
    /// Argument order does not matter; neither does which chunk is `self`.
    pub fn merge<'a>(&'a self, peers: impl IntoIterator<Item = &'a Chunk>) -> Chunk {
        let mut parts: Vec<&Chunk> = std::iter::once(self).chain(peers).collect();
        parts.sort_unstable_by_key(|c| c.id);
        fold_sorted(&parts)
    }
}

/// Merge a whole group. `None` if the group is empty.
pub fn merge_run(run: &[Chunk]) -> Option<Chunk> {
    let (first, rest) = run.split_first()?;
    Some(first.merge(rest))
}

/// `parts` must be non-empty and sorted ascending by identifier.
fn fold_sorted(parts: &[&Chunk]) -> Chunk {
    let first = parts[0];
    let last = parts[parts.len() - 1];

    let total: usize = parts.iter().map(|c| c.len()).sum();
    let mut data = BytesMut::with_capacity(total);
    for part in parts {
        data.extend_from_slice(&part.data);
    }

    // Identifier order puts the timestamp first, so this holds after sorting.
    debug_assert!(last.timestamp_ms() >= first.timestamp_ms());
    let span = last.timestamp_ms().saturating_sub(first.timestamp_ms());

    Chunk {
        id: first.id,
        duration: saturating_duration(span, last.duration),
        data: data.freeze(),
    }
}

/// Recombine a timestamp span with a trailing capture duration, clamped to
/// the 16-bit range.
pub fn saturating_duration(span_ms: u64, trailing: u16) -> u16 {
    let total = span_ms.saturating_add(u64::from(trailing));
    u16::try_from(total).unwrap_or(u16::MAX)
}
