//! Price-history feed adapter
//!
//! Wraps the external price-history provider behind a narrow trait so the
//! orchestrator (and tests) can substitute scripted feeds for the real one.

pub mod yahoo;

pub use yahoo::YahooFeed;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::types::{Bar, Symbol};

/// Bar cadence requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "5m")]
    FiveMinute,
    #[serde(rename = "15m")]
    FifteenMinute,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "1d")]
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::FiveMinute => "5m",
            Interval::FifteenMinute => "15m",
            Interval::Hourly => "1h",
            Interval::Daily => "1d",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One fetch call: symbol, cadence, and how far back to look
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub symbol: Symbol,
    pub interval: Interval,
    pub period_days: u32,
}

/// Classified fetch failures
///
/// Transient and rate-limited failures are retried by the orchestrator's
/// retry policy; not-found and fatal failures skip the symbol immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transient provider error: {0}")]
    Transient(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("symbol not found: {0}")]
    NotFound(Symbol),

    #[error("fatal fetch error: {0}")]
    Fatal(String),
}

impl FetchError {
    /// Whether the retry policy should try the same call again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::Transient(_) | FetchError::RateLimited
        )
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Transient(format!("http timeout: {err}"))
        } else if err.is_connect() {
            FetchError::Transient(format!("connect error: {err}"))
        } else {
            FetchError::Fatal(err.to_string())
        }
    }
}

/// Ordered price-history source
///
/// Implementations return bars sorted ascending by timestamp, one per
/// session or intraday interval, de-duplicated by timestamp.
pub trait PriceFeed {
    fn fetch(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = Result<Vec<Bar>, FetchError>> + Send;
}
