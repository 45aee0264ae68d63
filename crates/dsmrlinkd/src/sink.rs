//! Reassembly loop — the write side of the daemon.
//!
//! Owns the `Reassembler`. Every completed telegram is wire-encoded and
//! appended to the output file.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use dsmrlink_core::{wire, Chunk, Reassembler, ReassemblyStats};

/// Open the output file for appending, creating it and its directory.
pub async fn open_output(path: &Path) -> Result<tokio::fs::File> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create output dir: {}", parent.display()))?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open output: {}", path.display()))
}

pub async fn reassembly_loop<W: AsyncWrite + Unpin>(
    mut chunk_rx: mpsc::Receiver<Chunk>,
    mut reassembler: Reassembler,
    mut output: W,
) -> Result<ReassemblyStats> {
    while let Some(chunk) = chunk_rx.recv().await {
        for telegram in reassembler.push(chunk) {
            write_telegram(&mut output, &telegram).await?;
        }
    }

    // Input is gone; a telegram without its trailer will never complete.
    if let Some(rest) = reassembler.flush() {
        tracing::warn!(
            id = %rest.id(),
            len = rest.len(),
            "discarding incomplete telegram at end of input"
        );
    }

    output.flush().await.context("failed to flush output")?;
    Ok(reassembler.stats())
}

async fn write_telegram<W: AsyncWrite + Unpin>(output: &mut W, telegram: &Chunk) -> Result<()> {
    let bytes = match wire::encode(telegram) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(id = %telegram.id(), error = %e, "telegram not encodable, skipping");
            return Ok(());
        }
    };
    output
        .write_all(&bytes)
        .await
        .context("failed to append telegram")?;

    tracing::info!(
        id = %telegram.id(),
        duration_ms = telegram.duration(),
        len = telegram.len(),
        "telegram written"
    );
    Ok(())
}
