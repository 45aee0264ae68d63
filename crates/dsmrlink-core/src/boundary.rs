//! Telegram boundary detection.
//!
//! A P1 telegram opens with a `/`-prefixed identification line and closes
//! with `!` followed by a four-digit CRC and CR LF. There is no framing
//! beyond that, so the detector looks for those markers at the edges of
//! chunk payloads. A marker split across two chunks goes unnoticed, and a
//! corrupted payload that happens to look like a marker produces a false
//! boundary. Both are accepted limitations of the heuristic.

use crate::chunk::Chunk;

/// First byte of a telegram.
pub const START_MARKER: u8 = b'/';

/// Introduces the CRC line that closes a telegram.
pub const END_MARKER: u8 = b'!';

/// `!` + four hex digits + CR LF.
pub const TRAILER_LEN: usize = 7;

/// Where the telegram starting at index 0 of a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// No marker in this window yet. Buffer more chunks and look again.
    Pending,

    /// Chunks `[0, n)` form one telegram; chunk `n` follows it.
    At(usize),

    /// The trailer sits in the last chunk of the run: the whole run is one
    /// complete telegram and nothing after it has arrived yet.
    EndOfRun,
}

impl Boundary {
    /// Slice index ending the telegram in a run of `run_len` chunks.
    pub fn split_point(self, run_len: usize) -> Option<usize> {
        match self {
            Boundary::Pending => None,
            Boundary::At(n) => Some(n),
            Boundary::EndOfRun => Some(run_len),
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Boundary::Pending)
    }
}

/// Find the end of the telegram that starts at `run[0]`.
///
/// `run` must be sorted by identifier. Index 0 is never inspected: it is
/// taken to be inside the telegram already. A chunk opening with `/` ends
/// the telegram before it; a chunk closing with the trailer ends it after.
pub fn detect(run: &[Chunk]) -> Boundary {
    for (n, chunk) in run.iter().enumerate().skip(1) {
        let data = chunk.data();
        if starts_telegram(data) {
            return Boundary::At(n);
        }
        if ends_telegram(data) {
            return if n + 1 == run.len() {
                Boundary::EndOfRun
            } else {
                Boundary::At(n + 1)
            };
        }
    }
    Boundary::Pending
}

/// True if the payload opens with the telegram start marker.
pub fn starts_telegram(data: &[u8]) -> bool {
    data.first() == Some(&START_MARKER)
}

/// True if the payload closes with `!xxxx\r\n`.
pub fn ends_telegram(data: &[u8]) -> bool {
    data.len() >= TRAILER_LEN
        && data[data.len() - TRAILER_LEN] == END_MARKER
        && data.ends_with(b"\r\n")
}
