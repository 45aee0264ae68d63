//! Capture loop — the read side of the daemon.
//!
//! Every read from the source becomes one chunk. Its duration is the time
//! the read spent waiting, in milliseconds, clamped to the 16-bit range.

use std::time::Instant;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{broadcast, mpsc};

use dsmrlink_core::{Chunk, IdGenerator};

pub type Source = Box<dyn AsyncRead + Unpin + Send>;

/// Open the configured byte source. "-" reads from stdin.
pub async fn open_source(path: &str) -> Result<Source> {
    if path == "-" {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open source {path}"))?;
    Ok(Box::new(file))
}

pub async fn capture_loop<R: RngCore + Send>(
    mut source: Source,
    mut ids: IdGenerator<R>,
    read_buffer: usize,
    chunk_tx: mpsc::Sender<Chunk>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let mut buf = vec![0u8; read_buffer.max(1)];

    loop {
        let started = Instant::now();
        let n = tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("capture loop shutting down");
                return Ok(());
            }
            r = source.read(&mut buf) => r.context("source read failed")?,
        };

        if n == 0 {
            tracing::info!("source closed");
            return Ok(());
        }

        let duration = u16::try_from(started.elapsed().as_millis()).unwrap_or(u16::MAX);
        // Entropy failure means the RNG is broken; there is no point retrying.
        let chunk = Chunk::capture(&mut ids, duration, Bytes::copy_from_slice(&buf[..n]))
            .context("failed to mint chunk identifier")?;

        tracing::trace!(
            id = %chunk.id(),
            len = chunk.len(),
            duration_ms = duration,
            "chunk captured"
        );

        if chunk_tx.send(chunk).await.is_err() {
            bail!("reassembly task dropped, terminating capture loop");
        }
    }
}
