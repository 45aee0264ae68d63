//! dsmrlink-core — chunk identifiers, merging, wire format, and telegram
//! boundary detection for reassembling P1 smart-meter telegrams.
//! The daemon and the integration tests depend on this crate.

pub mod boundary;
pub mod chunk;
pub mod config;
pub mod id;
pub mod reassembly;
pub mod wire;

pub use boundary::{detect, Boundary};
pub use chunk::{merge_run, saturating_duration, Chunk};
pub use id::{IdError, IdGenerator, Ulid};
pub use reassembly::{Reassembler, ReassemblyStats};
pub use wire::{decode, encode, read_chunk, write_chunk, ChunkReader, WireError};
