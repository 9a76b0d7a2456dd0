//! Bounded retry policy for feed calls
//!
//! Every fetch runs under a per-call timeout; transient failures (timeout,
//! rate limit, flaky network) are retried with linear backoff, fatal ones
//! are returned immediately so the orchestrator can skip the symbol.

use std::time::Duration;
use tracing::warn;

use crate::config::FeedConfig;
use crate::feed::{FetchError, FetchRequest, PriceFeed};
use crate::types::Bar;

/// Retry policy: max attempts, per-call timeout, linear backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, timeout: Duration, backoff: Duration) -> Self {
        Self {
            max_attempts,
            timeout,
            backoff,
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(config.retries, config.timeout(), config.backoff())
    }

    /// Fetch with retries. Returns the last error once attempts are
    /// exhausted, or the first non-retryable error immediately.
    pub async fn fetch<F: PriceFeed>(
        &self,
        feed: &F,
        request: &FetchRequest,
    ) -> Result<Vec<Bar>, FetchError> {
        let mut last_error = FetchError::Transient("no attempt made".to_string());

        for attempt in 1..=self.max_attempts {
            let outcome = tokio::time::timeout(self.timeout, feed.fetch(request)).await;

            let error = match outcome {
                Ok(Ok(bars)) => return Ok(bars),
                Ok(Err(e)) => e,
                Err(_) => FetchError::Timeout(self.timeout),
            };

            if !error.is_retryable() {
                return Err(error);
            }

            warn!(
                "Attempt {}/{} failed for {}: {}",
                attempt, self.max_attempts, request.symbol, error
            );
            last_error = error;

            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Interval;
    use crate::types::Symbol;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Feed that plays back a scripted sequence of outcomes
    struct ScriptedFeed {
        script: Mutex<Vec<Result<Vec<Bar>, FetchError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedFeed {
        fn new(script: Vec<Result<Vec<Bar>, FetchError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl PriceFeed for ScriptedFeed {
        async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Bar>, FetchError> {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(FetchError::Fatal("script exhausted".into()));
            }
            script.remove(0)
        }
    }

    fn request() -> FetchRequest {
        FetchRequest {
            symbol: Symbol::new("TCS.NS"),
            interval: Interval::Daily,
            period_days: 370,
        }
    }

    fn one_bar() -> Vec<Bar> {
        vec![Bar {
            datetime: Utc::now(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 1000.0,
        }]
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_secs(1),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let feed = ScriptedFeed::new(vec![Ok(one_bar())]);
        let bars = fast_policy(3).fetch(&feed, &request()).await.unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(feed.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let feed = ScriptedFeed::new(vec![
            Err(FetchError::Transient("503".into())),
            Err(FetchError::RateLimited),
            Ok(one_bar()),
        ]);
        let bars = fast_policy(3).fetch(&feed, &request()).await.unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(feed.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let feed = ScriptedFeed::new(vec![
            Err(FetchError::Transient("503".into())),
            Err(FetchError::Transient("503".into())),
            Err(FetchError::Transient("503".into())),
        ]);
        let result = fast_policy(3).fetch(&feed, &request()).await;
        assert!(matches!(result, Err(FetchError::Transient(_))));
        assert_eq!(feed.calls(), 3);
    }

    #[tokio::test]
    async fn test_not_found_short_circuits() {
        let feed = ScriptedFeed::new(vec![Err(FetchError::NotFound(Symbol::new("TCS.NS")))]);
        let result = fast_policy(3).fetch(&feed, &request()).await;
        assert!(matches!(result, Err(FetchError::NotFound(_))));
        // No retries burned on a permanently invalid symbol
        assert_eq!(feed.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_feed_times_out() {
        struct SlowFeed;
        impl PriceFeed for SlowFeed {
            async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Bar>, FetchError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(vec![])
            }
        }

        let policy = RetryPolicy::new(2, Duration::from_millis(10), Duration::from_millis(1));
        let result = policy.fetch(&SlowFeed, &request()).await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
    }
}
