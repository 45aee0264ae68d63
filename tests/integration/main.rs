//! dsmrlink integration test harness.
//!
//! Tests here drive the public `dsmrlink-core` API end to end: captured
//! chunks go through the wire format, the boundary detector, and the
//! merger exactly as the daemon uses them.
//!
//!   cargo test --test integration
//!
//! The fixture is a real capture from a Kaifa meter: four telegrams ten
//! seconds apart, one line per chunk, ten milliseconds between lines.

use bytes::Bytes;
use dsmrlink_core::id::ENTROPY_LEN;
use dsmrlink_core::{Chunk, Ulid};

mod merge;
mod wire_stream;

// ── Fixture ───────────────────────────────────────────────────────────────────

/// Lines of one telegram, minus the CRC trailer.
pub const TELEGRAM_LINES: [&str; 31] = [
    "/KFM5KAIFA-METER\r\n\r\n",
    "1-3:0.2.8(42)\r\n",
    "0-0:1.0.0(160321104324W)\r\n",
    "0-0:96.1.1(5f5f52454441435445445f5f)\r\n",
    "1-0:1.8.1(000843.085*kWh)\r\n",
    "1-0:1.8.2(001201.241*kWh)\r\n",
    "1-0:2.8.1(000000.000*kWh)\r\n",
    "1-0:2.8.2(000000.000*kWh)\r\n",
    "0-0:96.14.0(0002)\r\n",
    "1-0:1.7.0(00.347*kW)\r\n",
    "1-0:2.7.0(00.000*kW)\r\n",
    "0-0:96.7.21(00010)\r\n",
    "0-0:96.7.9(00007)\r\n",
    "1-0:99.97.0(4)(0-0:96.7.19)(000105033123W)(0000358148*s)(000101000001W)(2147483647*s)(000101000007W)(2147483647*s)(000101000001W)(2147483647*s)\r\n",
    "1-0:32.32.0(00001)\r\n",
    "1-0:52.32.0(00000)\r\n",
    "1-0:72.32.0(00000)\r\n",
    "1-0:32.36.0(00000)\r\n",
    "1-0:52.36.0(00000)\r\n",
    "1-0:72.36.0(00000)\r\n",
    "0-0:96.13.1()\r\n",
    "0-0:96.13.0()\r\n",
    "1-0:31.7.0(001*A)\r\n",
    "1-0:51.7.0(000*A)\r\n",
    "1-0:71.7.0(000*A)\r\n",
    "1-0:21.7.0(00.338*kW)\r\n",
    "1-0:22.7.0(00.000*kW)\r\n",
    "1-0:41.7.0(00.010*kW)\r\n",
    "1-0:42.7.0(00.000*kW)\r\n",
    "1-0:61.7.0(00.000*kW)\r\n",
    "1-0:62.7.0(00.000*kW)\r\n",
];

/// CRC trailers of the four captured telegrams.
pub const TRAILERS: [&str; 4] = ["!7508\r\n", "!7508\r\n", "!5F7F\r\n", "!42E4\r\n"];

/// Bytes in one reassembled telegram.
pub const TELEGRAM_LEN: usize = 806;

/// First-line to end-of-trailer time of one telegram, in ms.
pub const TELEGRAM_DURATION: u16 = 310;

/// Identifier with zeroed entropy, like a producer with no randomness.
pub fn id_at(ts: u64) -> Ulid {
    Ulid::from_parts(ts, [0; ENTROPY_LEN]).expect("fixture timestamp fits in 48 bits")
}

/// One telegram as captured: 32 chunks, 10 ms apart, starting at `base + 10`.
pub fn telegram_chunks(base: u64, trailer: &'static str) -> Vec<Chunk> {
    TELEGRAM_LINES
        .iter()
        .chain(std::iter::once(&trailer))
        .enumerate()
        .map(|(i, line)| {
            let line: &'static str = *line;
            Chunk::new(
                id_at(base + 10 * (i as u64 + 1)),
                0,
                Bytes::from_static(line.as_bytes()),
            )
        })
        .collect()
}

/// The full four-telegram capture, in identifier order.
pub fn meter_capture() -> Vec<Chunk> {
    TRAILERS
        .iter()
        .enumerate()
        .flat_map(|(n, trailer)| telegram_chunks(10_000 * n as u64, trailer))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn fixture_is_sorted_and_sized() {
    let capture = meter_capture();
    assert_eq!(capture.len(), 4 * 32);
    assert!(capture.windows(2).all(|w| w[0].id() < w[1].id()));

    let first: usize = capture[..32].iter().map(|c| c.len()).sum();
    assert_eq!(first, TELEGRAM_LEN);
}
