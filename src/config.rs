//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files and validation
//! of the screener options before a run starts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::feed::Interval;

/// Configuration problems that abort a run before any fetch occurs
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("lookback set must not be empty")]
    EmptyLookbacks,

    #[error("lookback windows must be > 0")]
    ZeroLookback,

    #[error("chunk size must be > 0")]
    ZeroChunkSize,

    #[error("retry count must be > 0")]
    ZeroRetries,

    #[error("reversal pullback fraction must be in (0, 1], got {0}")]
    PullbackOutOfRange(f64),

    #[error("volume spike threshold must be > 0, got {0}")]
    NonPositiveVolumeThreshold(f64),

    #[error("symbol universe must not be empty")]
    EmptyUniverse,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    /// Validate the options that would otherwise only fail mid-scan
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.scan.lookbacks.is_empty() {
            return Err(ConfigurationError::EmptyLookbacks);
        }
        if self.scan.lookbacks.iter().any(|&l| l == 0) {
            return Err(ConfigurationError::ZeroLookback);
        }
        if self.scan.chunk_size == 0 {
            return Err(ConfigurationError::ZeroChunkSize);
        }
        if self.feed.retries == 0 {
            return Err(ConfigurationError::ZeroRetries);
        }
        if let Some(fraction) = self.scan.reversal_pullback {
            if fraction <= 0.0 || fraction > 1.0 {
                return Err(ConfigurationError::PullbackOutOfRange(fraction));
            }
        }
        if let Some(threshold) = self.scan.volume_spike_threshold {
            if threshold <= 0.0 {
                return Err(ConfigurationError::NonPositiveVolumeThreshold(threshold));
            }
        }
        Ok(())
    }

    /// Calendar days of history to request so the longest lookback has a
    /// full window of trading sessions plus the bar under evaluation.
    ///
    /// Lookbacks count trading bars while the provider's range is calendar
    /// days; the NSE trades roughly 5 of every 7 days, so the bar count is
    /// scaled by 8/5 with a holiday buffer on top.
    pub fn period_days(&self) -> u32 {
        match self.feed.interval {
            Interval::Daily => {
                let max_lookback = self.scan.lookbacks.iter().copied().max().unwrap_or(0) as u32;
                (max_lookback + 1) * 8 / 5 + 30
            }
            _ => self.feed.intraday_period_days,
        }
    }
}

/// Feed adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub interval: Interval,
    /// Period requested for intraday intervals, in days
    pub intraday_period_days: u32,
    /// Per-fetch-call timeout in seconds
    pub timeout_secs: u64,
    /// Retry attempts per symbol per cycle
    pub retries: u32,
    /// Base backoff between retry attempts in milliseconds
    pub backoff_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            interval: Interval::Daily,
            intraday_period_days: 1,
            timeout_secs: 20,
            retries: 3,
            backoff_ms: 500,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Scan loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Trailing-bar window sizes to evaluate per symbol
    pub lookbacks: Vec<usize>,
    /// Symbols per batch, bounding request volume per burst
    pub chunk_size: usize,
    /// Sleep between full-universe cycles in continuous mode, seconds
    pub cycle_sleep_secs: u64,
    /// Keep candidates only when the latest bar's volume is at least this
    /// multiple of the window's average volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_spike_threshold: Option<f64>,
    /// Fraction of the window high below which a post-breakout close counts
    /// as a reversal; reversal detection is off when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversal_pullback: Option<f64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            lookbacks: vec![50, 100, 200, 365],
            chunk_size: 25,
            cycle_sleep_secs: 300,
            volume_spike_threshold: None,
            reversal_pullback: None,
        }
    }
}

impl ScanConfig {
    pub fn cycle_sleep(&self) -> Duration {
        Duration::from_secs(self.cycle_sleep_secs)
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Append-only CSV of emitted signals
    pub csv_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            csv_path: "signals.csv".to_string(),
        }
    }
}
