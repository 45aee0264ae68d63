//! dsmrlinkd — reads raw P1 output, reassembles telegrams, appends them
//! wire-encoded to an output file.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, mpsc};

use dsmrlink_core::config::DsmrConfig;
use dsmrlink_core::{IdGenerator, Reassembler};

mod capture;
mod sink;

/// Chunks in flight between the capture and reassembly tasks.
const CHUNK_QUEUE: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = DsmrConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let mut config = DsmrConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        DsmrConfig::default()
    });

    if let Some(path) = std::env::args().nth(1) {
        config.source.path = path;
    }
    tracing::info!(source = %config.source.path, "dsmrlinkd starting");

    let tag = config.source.tag_bytes()?;
    let ids = IdGenerator::new(tag, StdRng::from_entropy());
    tracing::info!(tag = %config.source.tag, "identifier generator ready");

    let source = capture::open_source(&config.source.path).await?;
    let output = sink::open_output(&config.output.path).await?;
    tracing::info!(path = %config.output.path.display(), "appending telegrams");

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_QUEUE);

    let capture_task = tokio::spawn(capture::capture_loop(
        source,
        ids,
        config.source.read_buffer,
        chunk_tx,
        shutdown_tx.subscribe(),
    ));

    let reassembly_task = tokio::spawn(sink::reassembly_loop(
        chunk_rx,
        Reassembler::new(config.reassembly.max_pending),
        output,
    ));

    // ── Wait for exit ────────────────────────────────────────────────────────

    // The capture task ends on shutdown or end of input; dropping its sender
    // lets the reassembly task drain and finish.
    match capture_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "capture task failed"),
        Err(e) => tracing::error!(error = %e, "capture task panicked"),
    }

    let stats = reassembly_task
        .await
        .context("reassembly task panicked")??;
    tracing::info!(
        telegrams = stats.telegrams,
        fragments_dropped = stats.fragments_dropped,
        chunks_overflowed = stats.chunks_overflowed,
        incomplete = stats.incomplete,
        "dsmrlinkd stopped"
    );

    Ok(())
}
