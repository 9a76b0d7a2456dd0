//! Continuous watch command
//!
//! Repeats full-universe scans with a sleep between cycles until Ctrl+C.
//! The deduplicator lives for the whole watch, so a signal already alerted
//! in an earlier cycle stays silent for the rest of the process.

use anyhow::{Context, Result};
use std::sync::atomic::Ordering;
use tracing::{error, info};

use breakout_screener::feed::YahooFeed;
use breakout_screener::sink::CsvSink;
use breakout_screener::{Deduplicator, Scanner, Universe};

use super::scan::load_config;

pub fn run(
    config_path: String,
    universe_path: String,
    output: Option<String>,
    interval: Option<u64>,
    cycles: Option<u32>,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config_path, universe_path, output, interval, cycles))
}

async fn run_async(
    config_path: String,
    universe_path: String,
    output: Option<String>,
    interval: Option<u64>,
    cycles: Option<u32>,
) -> Result<()> {
    let mut config = load_config(&config_path, output)?;
    if let Some(secs) = interval {
        config.scan.cycle_sleep_secs = secs;
    }

    let universe = Universe::load_csv(&universe_path)?;

    info!(
        "Watching {} symbols every {}s (lookbacks {:?})",
        universe.len(),
        config.scan.cycle_sleep_secs,
        config.scan.lookbacks
    );

    let feed = YahooFeed::new(config.feed.timeout())?;
    let sink = CsvSink::open(&config.output.csv_path)?;

    let mut scanner = Scanner::new(config, feed, Deduplicator::new(), sink)?;
    let cancel = scanner.cancel_flag();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping after the current symbol...");
                cancel.store(true, Ordering::SeqCst);
            }
            Err(e) => {
                error!("Error setting up signal handler: {}", e);
            }
        }
    });

    let summaries = scanner.run(&universe, cycles).await?;

    let emitted: usize = summaries.iter().map(|s| s.emitted).sum();
    info!(
        "Watch ended after {} cycle(s), {} signal(s) emitted",
        summaries.len(),
        emitted
    );

    Ok(())
}
