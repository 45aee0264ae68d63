use crate::*;

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Write};

use anyhow::{Context, Result};
use dsmrlink_core::wire::{read_chunk, write_chunk, ChunkReader, WireError, HEADER_LEN};
use dsmrlink_core::Reassembler;

#[test]
fn test_capture_round_trips_through_stream() -> Result<()> {
    let capture = meter_capture();
    let mut stream = Vec::new();
    for chunk in &capture {
        write_chunk(&mut stream, chunk)?;
    }

    let expected_len: usize = capture.iter().map(|c| HEADER_LEN + c.len()).sum();
    assert_eq!(stream.len(), expected_len);

    let decoded: Vec<Chunk> = ChunkReader::new(Cursor::new(stream)).collect::<Result<_, _>>()?;
    assert_eq!(decoded, capture);
    Ok(())
}

#[test]
fn test_telegram_file_append_and_replay() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("dsmrlink-wire-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("telegrams.bin");

    // Write reassembled telegrams the way the daemon does.
    {
        let mut out = BufWriter::new(File::create(&path)?);
        let mut reassembler = Reassembler::default();
        for chunk in meter_capture() {
            for telegram in reassembler.push(chunk) {
                write_chunk(&mut out, &telegram)?;
            }
        }
        out.flush()?;
    }

    let mut src = BufReader::new(File::open(&path).context("telegram file missing")?);
    let mut count = 0;
    while let Some(telegram) = read_chunk(&mut src)? {
        assert_eq!(telegram.len(), TELEGRAM_LEN);
        assert_eq!(telegram.duration(), TELEGRAM_DURATION);
        count += 1;
    }
    assert_eq!(count, 4);

    std::fs::remove_dir_all(&dir).ok();
    Ok(())
}

#[test]
fn test_torn_tail_is_reported() -> Result<()> {
    let capture = meter_capture();
    let mut stream = Vec::new();
    for chunk in &capture[..3] {
        write_chunk(&mut stream, chunk)?;
    }
    // Lose the last four bytes, as if the writer died mid-append.
    stream.truncate(stream.len() - 4);

    let results: Vec<Result<Chunk, WireError>> = ChunkReader::new(Cursor::new(stream)).collect();
    assert_eq!(results.len(), 3);
    assert!(results[..2].iter().all(|r| r.is_ok()));
    assert!(matches!(results[2], Err(WireError::Truncated { .. })));
    Ok(())
}
