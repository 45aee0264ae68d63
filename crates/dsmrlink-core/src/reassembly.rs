//! Reassembler — turns a live stream of chunks into whole telegrams.
//!
//! Chunks are buffered in identifier order. After every push the buffer is
//! scanned for a boundary; each complete group is merged into a single
//! chunk and removed from the front. Whatever remains waits for more input.

use tracing::{debug, warn};

use crate::boundary::{detect, starts_telegram};
use crate::chunk::{merge_run, Chunk};

/// Default cap on buffered chunks. A telegram is a few dozen lines, so a
/// thousand chunks without a boundary means the stream is not P1.
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// Counters kept across the life of a reassembler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    /// Complete telegrams emitted.
    pub telegrams: u64,
    /// Groups dropped because they did not open with a start marker.
    pub fragments_dropped: u64,
    /// Chunks discarded because the buffer hit `max_pending`.
    pub chunks_overflowed: u64,
    /// Headed remainders handed out by `flush` without a closing boundary.
    pub incomplete: u64,
}

pub struct Reassembler {
    pending: Vec<Chunk>,
    max_pending: usize,
    stats: ReassemblyStats,
}

impl Reassembler {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_pending: max_pending.max(1),
            stats: ReassemblyStats::default(),
        }
    }

    /// Buffer a chunk and return every telegram it completes.
    pub fn push(&mut self, chunk: Chunk) -> Vec<Chunk> {
        // Chunks nearly always arrive in order; fall back to an insert when
        // one does not.
        let late = self
            .pending
            .last()
            .is_some_and(|last| chunk.id() < last.id());
        if late {
            let at = self.pending.partition_point(|c| c.id() < chunk.id());
            self.pending.insert(at, chunk);
        } else {
            self.pending.push(chunk);
        }

        let mut done = Vec::new();
        while let Some(end) = detect(&self.pending).split_point(self.pending.len()) {
            let group: Vec<Chunk> = self.pending.drain(..end).collect();
            if let Some(telegram) = self.accept(&group) {
                self.stats.telegrams += 1;
                debug!(
                    id = %telegram.id(),
                    chunks = group.len(),
                    len = telegram.len(),
                    duration_ms = telegram.duration(),
                    "telegram reassembled"
                );
                done.push(telegram);
            }
        }

        self.enforce_limit();
        done
    }

    /// Merge whatever is still buffered, e.g. when the source closes.
    ///
    /// No boundary closed the remainder, so it is counted as incomplete
    /// rather than as a telegram. The caller decides whether to keep it.
    pub fn flush(&mut self) -> Option<Chunk> {
        let group = std::mem::take(&mut self.pending);
        let rest = self.accept(&group)?;
        self.stats.incomplete += 1;
        Some(rest)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }

    /// Merge a group that opens with a telegram header; drop it otherwise.
    fn accept(&mut self, group: &[Chunk]) -> Option<Chunk> {
        let first = group.first()?;
        if !starts_telegram(first.data()) {
            self.stats.fragments_dropped += 1;
            warn!(
                id = %first.id(),
                chunks = group.len(),
                "dropping fragment without telegram header"
            );
            return None;
        }

        merge_run(group)
    }

    fn enforce_limit(&mut self) {
        if self.pending.len() <= self.max_pending {
            return;
        }
        let excess = self.pending.len() - self.max_pending;
        self.pending.drain(..excess);
        self.stats.chunks_overflowed += excess as u64;
        warn!(
            discarded = excess,
            max_pending = self.max_pending,
            "no telegram boundary within buffer limit, discarding oldest chunks"
        );
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}
