//! Time-ordered chunk identifiers.
//!
//! A `Ulid` is 128 bits: a 48-bit big-endian millisecond timestamp followed
//! by 80 bits of entropy. Comparing the raw bytes orders identifiers by
//! time first, entropy second.
//!
//! The first four entropy bytes carry a producer tag, so every identifier
//! minted by one capture source can be traced back to it. The remaining six
//! bytes come from a randomness source handed to the generator explicitly.
//! Nothing here touches process-global randomness.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

/// Total identifier size in bytes.
pub const ULID_LEN: usize = 16;

/// Size of the timestamp component in bytes.
pub const TIMESTAMP_LEN: usize = 6;

/// Size of the entropy component in bytes.
pub const ENTROPY_LEN: usize = 10;

/// Size of the producer tag at the front of the entropy.
pub const TAG_LEN: usize = 4;

/// Largest timestamp representable in 48 bits.
pub const MAX_TIMESTAMP_MS: u64 = (1 << 48) - 1;

// ── Ulid ──────────────────────────────────────────────────────────────────────

/// 128-bit, time-sortable, globally unique identifier.
///
/// Wraps `ulid::Ulid`, which supplies the bit layout and the 26-character
/// Crockford base32 text form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ulid(ulid::Ulid);

impl Ulid {
    /// Build an identifier from a millisecond timestamp and raw entropy.
    pub fn from_parts(timestamp_ms: u64, entropy: [u8; ENTROPY_LEN]) -> Result<Self, IdError> {
        if timestamp_ms > MAX_TIMESTAMP_MS {
            return Err(IdError::TimestampOverflow(timestamp_ms));
        }
        let mut random = [0u8; ULID_LEN];
        random[TIMESTAMP_LEN..].copy_from_slice(&entropy);
        Ok(Self(ulid::Ulid::from_parts(
            timestamp_ms,
            u128::from_be_bytes(random),
        )))
    }

    pub fn from_bytes(bytes: [u8; ULID_LEN]) -> Self {
        Self(ulid::Ulid::from_bytes(bytes))
    }

    /// Big-endian wire form: timestamp first, then entropy.
    pub fn to_bytes(self) -> [u8; ULID_LEN] {
        self.0.to_bytes()
    }

    /// Milliseconds since the Unix epoch encoded in the first 48 bits.
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }

    pub fn entropy(&self) -> [u8; ENTROPY_LEN] {
        let mut entropy = [0u8; ENTROPY_LEN];
        entropy.copy_from_slice(&self.0.random().to_be_bytes()[TIMESTAMP_LEN..]);
        entropy
    }

    /// The producer tag stamped by the generator that minted this id.
    pub fn tag(&self) -> [u8; TAG_LEN] {
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&self.entropy()[..TAG_LEN]);
        tag
    }
}

impl Default for Ulid {
    fn default() -> Self {
        Self(ulid::Ulid::nil())
    }
}

impl fmt::Display for Ulid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Ulid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ulid({self})")
    }
}

impl From<[u8; ULID_LEN]> for Ulid {
    fn from(bytes: [u8; ULID_LEN]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Ulid> for ulid::Ulid {
    fn from(id: Ulid) -> Self {
        id.0
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// Mints identifiers for one capture source.
///
/// The generator owns its randomness source. It adds no locking of its own:
/// concurrent producers either hold one generator each or share one behind
/// a lock of their choosing.
pub struct IdGenerator<R> {
    tag: [u8; TAG_LEN],
    rng: R,
}

impl<R: RngCore> IdGenerator<R> {
    pub fn new(tag: [u8; TAG_LEN], rng: R) -> Self {
        Self { tag, rng }
    }

    pub fn tag(&self) -> [u8; TAG_LEN] {
        self.tag
    }

    /// Mint an identifier stamped with the current wall-clock time.
    pub fn generate(&mut self) -> Result<Ulid, IdError> {
        self.generate_at(now_ms())
    }

    /// Mint an identifier for an explicit millisecond timestamp.
    ///
    /// Fails if the timestamp exceeds 48 bits or the randomness source
    /// cannot supply the six trailing entropy bytes. Neither case is retried.
    pub fn generate_at(&mut self, timestamp_ms: u64) -> Result<Ulid, IdError> {
        if timestamp_ms > MAX_TIMESTAMP_MS {
            return Err(IdError::TimestampOverflow(timestamp_ms));
        }
        let mut entropy = [0u8; ENTROPY_LEN];
        entropy[..TAG_LEN].copy_from_slice(&self.tag);
        self.rng
            .try_fill_bytes(&mut entropy[TAG_LEN..])
            .map_err(|e| IdError::EntropyExhausted(e.to_string()))?;
        Ulid::from_parts(timestamp_ms, entropy)
    }
}

/// Milliseconds since the Unix epoch. A clock before 1970 reads as zero.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("timestamp {0} does not fit in 48 bits")]
    TimestampOverflow(u64),

    #[error("randomness source exhausted: {0}")]
    EntropyExhausted(String),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
