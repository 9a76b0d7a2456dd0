//! Yahoo Finance chart-API client
//!
//! Public endpoint, no API key required. Returns OHLCV history for one
//! symbol per request; rows with missing fields (halted sessions) are
//! dropped before the bars reach the analyzer.

use chrono::DateTime;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::{FetchError, FetchRequest, PriceFeed};
use crate::types::Bar;

/// Base URL for the Yahoo chart API
const YAHOO_CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo refuses requests without a browser-ish user agent
const USER_AGENT: &str = "Mozilla/5.0";

/// Yahoo Finance feed adapter
#[derive(Debug, Clone)]
pub struct YahooFeed {
    client: Client,
    base_url: String,
}

impl YahooFeed {
    /// Create a new feed with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Fatal(format!("failed to build http client: {e}")))?;

        Ok(YahooFeed {
            client,
            base_url: YAHOO_CHART_BASE.to_string(),
        })
    }

    /// Point the client at a different endpoint (stub servers in tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn classify_status(status: StatusCode, request: &FetchRequest) -> FetchError {
        if status == StatusCode::NOT_FOUND {
            FetchError::NotFound(request.symbol.clone())
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            FetchError::RateLimited
        } else if status.is_server_error() {
            FetchError::Transient(format!("provider returned {status}"))
        } else {
            FetchError::Fatal(format!("provider returned {status}"))
        }
    }
}

impl PriceFeed for YahooFeed {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Bar>, FetchError> {
        let url = format!("{}/{}", self.base_url, request.symbol);
        let range = format!("{}d", request.period_days);

        debug!(
            "Fetching bars: symbol={}, interval={}, range={}",
            request.symbol, request.interval, range
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("interval", request.interval.as_str()),
                ("range", range.as_str()),
                ("events", "history"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::classify_status(status, request));
        }

        let payload: ChartResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Fatal(format!("failed to parse chart response: {e}")))?;

        if let Some(err) = payload.chart.error {
            if err.code.eq_ignore_ascii_case("Not Found") {
                return Err(FetchError::NotFound(request.symbol.clone()));
            }
            return Err(FetchError::Fatal(format!(
                "provider error {}: {}",
                err.code, err.description
            )));
        }

        let result = payload
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| FetchError::NotFound(request.symbol.clone()))?;

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Fatal("chart response missing quote block".into()))?;

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let row = (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
                quote.volume.get(i).copied().flatten(),
            );
            let (Some(open), Some(high), Some(low), Some(close), volume) = row else {
                continue;
            };
            let Some(datetime) = DateTime::from_timestamp(ts, 0) else {
                continue;
            };

            match Bar::new(datetime, open, high, low, close, volume.unwrap_or(0.0)) {
                Ok(bar) => bars.push(bar),
                Err(e) => {
                    warn!("Dropping invalid bar for {} at {}: {}", request.symbol, ts, e);
                }
            }
        }

        bars.sort_by_key(|b| b.datetime);
        bars.dedup_by_key(|b| b.datetime);

        debug!("Fetched {} bars for {}", bars.len(), request.symbol);
        Ok(bars)
    }
}

#[derive(Debug, serde::Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, serde::Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, serde::Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, serde::Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, serde::Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, serde::Deserialize, Default)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}
