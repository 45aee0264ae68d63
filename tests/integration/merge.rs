use crate::*;

use dsmrlink_core::{merge_run, IdGenerator};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[test]
fn test_merge_ignores_argument_order() {
    let telegram = telegram_chunks(0, TRAILERS[0]);
    let reference = merge_run(&telegram).expect("telegram is not empty");

    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let mut shuffled = telegram.clone();
        shuffled.shuffle(&mut rng);
        let merged = shuffled[0].merge(&shuffled[1..]);
        assert_eq!(merged, reference);
    }
}

#[test]
fn test_merge_duration_saturates_across_long_gaps() {
    // A telegram whose trailer arrives more than 65 s after its header.
    let head = Chunk::new(id_at(1_000), 5, &b"/KFM5KAIFA-METER\r\n\r\n"[..]);
    let tail = Chunk::new(id_at(1_000 + 65_000), 600, &b"!7508\r\n"[..]);

    let merged = tail.merge([&head]);
    assert_eq!(merged.duration(), u16::MAX);
    assert_eq!(merged.id(), head.id());
}

#[test]
fn test_producers_interleave_by_time() {
    let mut meter_a = IdGenerator::new(*b"MTRA", StdRng::seed_from_u64(1));
    let mut meter_b = IdGenerator::new(*b"MTRB", StdRng::seed_from_u64(2));

    let mut chunks = Vec::new();
    for t in 0..10u64 {
        let a = meter_a.generate_at(100 + 2 * t).unwrap();
        let b = meter_b.generate_at(101 + 2 * t).unwrap();
        chunks.push(Chunk::new(b, 0, format!("b{t}")));
        chunks.push(Chunk::new(a, 0, format!("a{t}")));
    }

    chunks.sort_by_key(|c| c.id());
    let stamps: Vec<u64> = chunks.iter().map(|c| c.timestamp_ms()).collect();
    assert_eq!(stamps, (100..120).collect::<Vec<_>>());
    assert!(chunks.iter().step_by(2).all(|c| c.id().tag() == *b"MTRA"));
}
