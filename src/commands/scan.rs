//! Single-pass scan command
//!
//! One full universe iteration, then exit. Meant for on-demand runs and
//! cron-style scheduling.

use anyhow::{Context, Result};
use tracing::info;

use breakout_screener::feed::YahooFeed;
use breakout_screener::sink::CsvSink;
use breakout_screener::{Config, Deduplicator, Scanner, Universe};

pub fn run(config_path: String, universe_path: String, output: Option<String>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config_path, universe_path, output))
}

async fn run_async(
    config_path: String,
    universe_path: String,
    output: Option<String>,
) -> Result<()> {
    let config = load_config(&config_path, output)?;
    let universe = Universe::load_csv(&universe_path)?;

    let feed = YahooFeed::new(config.feed.timeout())?;
    let sink = CsvSink::open(&config.output.csv_path)?;
    let csv_path = config.output.csv_path.clone();

    let mut scanner = Scanner::new(config, feed, Deduplicator::new(), sink)?;
    let summary = scanner.run_once(&universe).await?;

    info!(
        "Scan finished: {} signals from {} symbols ({} failed), rows appended to {}",
        summary.emitted, summary.scanned, summary.failed, csv_path
    );

    Ok(())
}

pub(crate) fn load_config(config_path: &str, output: Option<String>) -> Result<Config> {
    let mut config = if std::path::Path::new(config_path).exists() {
        Config::from_file(config_path)
            .context(format!("Failed to load config from {config_path}"))?
    } else {
        info!("Config {} not found, using defaults", config_path);
        Config::default()
    };

    if let Some(csv_path) = output {
        config.output.csv_path = csv_path;
    }

    Ok(config)
}
