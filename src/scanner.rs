//! Scan orchestrator
//!
//! Drives the loop: batches the universe, fetches bars through the retry
//! policy, runs the analyzer, filters candidates through the deduplicator,
//! and emits admitted signals to the sink. One symbol's failure never
//! aborts the rest of the scan; every skip and failure lands in the
//! per-cycle summary.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::analyzer::Analyzer;
use crate::config::{Config, ConfigurationError};
use crate::dedup::Deduplicator;
use crate::feed::{FetchError, FetchRequest, PriceFeed};
use crate::retry::RetryPolicy;
use crate::sink::SignalSink;
use crate::types::Symbol;
use crate::universe::{Universe, UniverseEntry};

/// Granularity of the inter-cycle wait, so cancellation stays prompt
const SLEEP_SLICE: Duration = Duration::from_millis(500);

/// Outcome counts for one full-universe pass
#[derive(Debug, Clone, Default)]
pub struct CycleSummary {
    pub cycle: u32,
    pub scanned: usize,
    pub emitted: usize,
    pub suppressed: usize,
    pub failed: usize,
    pub not_found: usize,
    pub insufficient: usize,
    pub failed_symbols: Vec<Symbol>,
}

/// Scan orchestrator over a substitutable feed and sink
pub struct Scanner<F: PriceFeed, S: SignalSink> {
    config: Config,
    feed: F,
    retry: RetryPolicy,
    analyzer: Analyzer,
    dedup: Deduplicator,
    sink: S,
    cancel: Arc<AtomicBool>,
    cycle_count: u32,
}

impl<F: PriceFeed, S: SignalSink> Scanner<F, S> {
    /// Build a scanner. The deduplicator is passed in so its lifetime (and
    /// reset) stays under the caller's control.
    pub fn new(
        config: Config,
        feed: F,
        dedup: Deduplicator,
        sink: S,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let retry = RetryPolicy::from_config(&config.feed);
        let analyzer = Analyzer::new(
            config.scan.lookbacks.clone(),
            config.scan.volume_spike_threshold,
            config.scan.reversal_pullback,
        );

        Ok(Scanner {
            config,
            feed,
            retry,
            analyzer,
            dedup,
            sink,
            cancel: Arc::new(AtomicBool::new(false)),
            cycle_count: 0,
        })
    }

    /// Shared flag checked between symbols and between cycles; set it to
    /// stop the scanner promptly
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Hand the sink back, consuming the scanner
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// One full pass over the universe
    pub async fn run_once(&mut self, universe: &Universe) -> Result<CycleSummary> {
        if universe.is_empty() {
            return Err(ConfigurationError::EmptyUniverse.into());
        }

        self.cycle_count += 1;
        let mut summary = CycleSummary {
            cycle: self.cycle_count,
            ..Default::default()
        };

        info!(
            "Starting scan cycle {}: {} symbols, lookbacks {:?}",
            summary.cycle,
            universe.len(),
            self.analyzer.lookbacks()
        );

        'chunks: for (chunk_idx, chunk) in universe.chunks(self.config.scan.chunk_size).enumerate()
        {
            debug!("Scanning chunk {} ({} symbols)", chunk_idx + 1, chunk.len());

            for entry in chunk {
                if self.cancelled() {
                    info!("Cancellation requested, aborting cycle {}", summary.cycle);
                    break 'chunks;
                }
                self.scan_symbol(entry, &mut summary).await?;
            }
        }

        info!(
            "Cycle {} complete: scanned={}, emitted={}, suppressed={}, \
             failed={}, not_found={}, insufficient={}",
            summary.cycle,
            summary.scanned,
            summary.emitted,
            summary.suppressed,
            summary.failed,
            summary.not_found,
            summary.insufficient
        );
        if !summary.failed_symbols.is_empty() {
            warn!(
                "Failed symbols this cycle: {}",
                summary
                    .failed_symbols
                    .iter()
                    .map(Symbol::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        Ok(summary)
    }

    /// Run until cancelled or `max_cycles` passes complete, sleeping the
    /// configured interval between passes
    pub async fn run(
        &mut self,
        universe: &Universe,
        max_cycles: Option<u32>,
    ) -> Result<Vec<CycleSummary>> {
        let mut summaries = Vec::new();

        loop {
            if self.cancelled() {
                break;
            }

            summaries.push(self.run_once(universe).await?);

            if let Some(max) = max_cycles {
                if summaries.len() as u32 >= max {
                    break;
                }
            }
            if self.cancelled() {
                break;
            }

            debug!(
                "Sleeping {}s until next cycle",
                self.config.scan.cycle_sleep_secs
            );
            self.cancellable_sleep(self.config.scan.cycle_sleep()).await;
        }

        Ok(summaries)
    }

    async fn scan_symbol(
        &mut self,
        entry: &UniverseEntry,
        summary: &mut CycleSummary,
    ) -> Result<()> {
        summary.scanned += 1;

        let request = FetchRequest {
            symbol: entry.symbol.clone(),
            interval: self.config.feed.interval,
            period_days: self.config.period_days(),
        };

        let bars = match self.retry.fetch(&self.feed, &request).await {
            Ok(bars) => bars,
            Err(FetchError::NotFound(symbol)) => {
                warn!("Symbol not found, skipping: {}", symbol);
                summary.not_found += 1;
                return Ok(());
            }
            Err(e) => {
                error!("Fetch failed for {} after retries: {}", entry.symbol, e);
                summary.failed += 1;
                summary.failed_symbols.push(entry.symbol.clone());
                return Ok(());
            }
        };

        let evaluation = self.analyzer.evaluate(&entry.symbol, &bars);
        summary.insufficient += evaluation.skipped.len();

        for signal in &evaluation.signals {
            if !self.dedup.admit(signal) {
                debug!(
                    "Suppressed repeat {} signal for {} ({} bars)",
                    signal.kind, signal.symbol, signal.lookback
                );
                summary.suppressed += 1;
                continue;
            }

            info!(
                "{} | {:>4} | {}-bar | close={:.2} window_high={:.2} ({}) @ {}",
                signal.symbol,
                entry.tag,
                signal.lookback,
                signal.close,
                signal.window_high,
                signal.window_high_date.format("%Y-%m-%d"),
                signal.kind
            );
            self.sink.emit(signal)?;
            summary.emitted += 1;
        }

        Ok(())
    }

    async fn cancellable_sleep(&self, duration: Duration) {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.cancelled() {
                return;
            }
            let slice = remaining.min(SLEEP_SLICE);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
        }
    }
}
