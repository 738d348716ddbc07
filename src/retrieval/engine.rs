//! Retry, endpoint fall-through and fallback.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::retrieval::config::RetrievalConfig;
use crate::retrieval::error::{RetrievalError, is_success_status};
use crate::retrieval::fetcher::{FetchResponse, Fetcher, HttpFetcher};
use crate::retrieval::result::RetrievalResult;

/// Retrieval engine: applies the retry policy on top of a [`Fetcher`].
#[derive(Clone)]
pub struct RetrievalEngine {
    config: RetrievalConfig,
    fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RetrievalEngine {
    /// Create an engine over any fetcher.
    #[must_use]
    pub fn new(config: RetrievalConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Create an engine backed by [`HttpFetcher`].
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the client cannot be built.
    pub fn http(config: RetrievalConfig) -> Result<Self, RetrievalError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Fetch one endpoint with up to `max_retries + 1` attempts.
    ///
    /// Any non-2xx outcome counts as a failed attempt, terminal 4xx included.
    /// Cancellation aborts the in-flight attempt or the pending delay and is
    /// reported as [`RetrievalError::Cancelled`].
    pub async fn retrieve_with_retry(&self, endpoint: &str, cancel: &CancellationToken) -> RetrievalResult {
        let started = Instant::now();
        let attempts = self.config.attempts();
        let mut retry_count = 0_u32;
        let mut last_status = None;
        let mut last_error = RetrievalError::NoEndpoints;

        for attempt in 1..=attempts {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(RetrievalError::Cancelled),
                outcome = self.attempt(endpoint) => outcome,
            };

            match outcome {
                Ok(response) if is_success_status(response.status) => {
                    debug!(endpoint, attempt, retry_count, "Retrieval succeeded");
                    return RetrievalResult {
                        success: true,
                        payload: response.body,
                        status: Some(response.status),
                        elapsed: started.elapsed(),
                        retry_count,
                        error: None,
                        endpoint: Some(endpoint.to_string()),
                        from_fallback: false,
                    };
                }
                Ok(response) => {
                    last_status = Some(response.status);
                    last_error = RetrievalError::Status(response.status);
                }
                Err(RetrievalError::Cancelled) => {
                    return self.cancelled(endpoint, retry_count, last_status, started);
                }
                Err(err) => last_error = err,
            }

            retry_count += 1;
            debug!(
                endpoint,
                attempt,
                retryable = last_error.is_retryable(),
                error = %last_error,
                "Retrieval attempt failed"
            );

            if attempt < attempts {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        return self.cancelled(endpoint, retry_count, last_status, started);
                    }
                    () = tokio::time::sleep(self.config.retry_delay) => {}
                }
            }
        }

        warn!(endpoint, retry_count, error = %last_error, "Endpoint exhausted its retries");
        let mut result = RetrievalResult::failure(last_error, retry_count, started.elapsed());
        result.status = last_status;
        result.endpoint = Some(endpoint.to_string());
        result
    }

    async fn attempt(&self, endpoint: &str) -> Result<FetchResponse, RetrievalError> {
        tokio::time::timeout(self.config.timeout, self.fetcher.fetch(endpoint))
            .await
            .unwrap_or(Err(RetrievalError::Timeout))
    }

    fn cancelled(
        &self,
        endpoint: &str,
        retry_count: u32,
        status: Option<u16>,
        started: Instant,
    ) -> RetrievalResult {
        debug!(endpoint, retry_count, max_retries = self.config.max_retries, "Retrieval cancelled");
        let mut result = RetrievalResult::failure(RetrievalError::Cancelled, retry_count, started.elapsed());
        result.status = status;
        result.endpoint = Some(endpoint.to_string());
        result
    }

    /// Try endpoints in order and return the first success.
    ///
    /// The retry count of a successful result includes the failed attempts of
    /// every endpoint tried before it. When all endpoints fail the result
    /// carries [`RetrievalError::AllEndpointsFailed`].
    pub async fn multi_endpoint_retrieval<S>(&self, endpoints: &[S], cancel: &CancellationToken) -> RetrievalResult
    where
        S: AsRef<str> + Sync,
    {
        let started = Instant::now();
        if endpoints.is_empty() {
            return RetrievalResult::failure(RetrievalError::NoEndpoints, 0, started.elapsed());
        }

        let mut prior_retries = 0_u32;
        let mut last = RetrievalResult::default();

        for endpoint in endpoints {
            let mut result = self.retrieve_with_retry(endpoint.as_ref(), cancel).await;
            result.retry_count += prior_retries;
            result.elapsed = started.elapsed();

            if result.success || result.is_cancelled() {
                return result;
            }

            prior_retries = result.retry_count;
            last = result;
        }

        let last_error = last.error.take().unwrap_or(RetrievalError::NoEndpoints);
        RetrievalResult {
            error: Some(RetrievalError::AllEndpointsFailed {
                endpoints: endpoints.len(),
                last_error: Box::new(last_error),
            }),
            ..last
        }
    }

    /// [`Self::multi_endpoint_retrieval`], substituting `fallback` when every
    /// endpoint failed and fallback is enabled. Cancellation is never masked.
    pub async fn retrieve_or_fallback<S>(
        &self,
        endpoints: &[S],
        fallback: Option<&[u8]>,
        cancel: &CancellationToken,
    ) -> RetrievalResult
    where
        S: AsRef<str> + Sync,
    {
        let result = self.multi_endpoint_retrieval(endpoints, cancel).await;
        if result.success || result.is_cancelled() || !self.config.enable_fallback {
            return result;
        }

        let Some(payload) = fallback else {
            return result;
        };

        info!(
            endpoints = endpoints.len(),
            retry_count = result.retry_count,
            error = ?result.error,
            "Using fallback payload"
        );
        RetrievalResult {
            success: true,
            payload: payload.to_vec(),
            status: None,
            elapsed: result.elapsed,
            retry_count: result.retry_count,
            error: None,
            endpoint: None,
            from_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Replays scripted statuses per endpoint; the last entry repeats.
    #[derive(Default)]
    struct ScriptedFetcher {
        scripts: Mutex<HashMap<String, VecDeque<u16>>>,
        hang: Vec<String>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn with(mut self, endpoint: &str, statuses: &[u16]) -> Self {
            self.scripts
                .get_mut()
                .unwrap_or_else(|err| unreachable!("{err}"))
                .insert(endpoint.to_string(), statuses.iter().copied().collect());
            self
        }

        fn hanging(mut self, endpoint: &str) -> Self {
            self.hang.push(endpoint.to_string());
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, endpoint: &str) -> Result<FetchResponse, RetrievalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang.iter().any(|e| e == endpoint) {
                std::future::pending::<()>().await;
            }
            let status = {
                let mut scripts = self.scripts.lock().unwrap_or_else(|err| unreachable!("{err}"));
                let script = scripts
                    .get_mut(endpoint)
                    .ok_or_else(|| RetrievalError::Connect(endpoint.to_string()))?;
                if script.len() > 1 {
                    script.pop_front().unwrap_or(500)
                } else {
                    script.front().copied().unwrap_or(500)
                }
            };
            Ok(FetchResponse::new(status, format!("{endpoint}:{status}")))
        }
    }

    fn engine(fetcher: Arc<ScriptedFetcher>, max_retries: u32) -> RetrievalEngine {
        let config = RetrievalConfig::default()
            .with_max_retries(max_retries)
            .with_retry_delay(Duration::from_millis(1));
        RetrievalEngine::new(config, fetcher)
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let fetcher = Arc::new(ScriptedFetcher::default().with("a", &[500, 503, 200]));
        let result = engine(Arc::clone(&fetcher), 3)
            .retrieve_with_retry("a", &CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(result.retry_count, 2);
        assert_eq!(result.status, Some(200));
        assert_eq!(result.text(), "a:200");
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_never_success() {
        let fetcher = Arc::new(ScriptedFetcher::default().with("a", &[500]));
        let result = engine(Arc::clone(&fetcher), 2)
            .retrieve_with_retry("a", &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.retry_count, 3);
        assert_eq!(result.status, Some(500));
        assert_eq!(result.error, Some(RetrievalError::Status(500)));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_terminal_status_still_consumes_retries() {
        let fetcher = Arc::new(ScriptedFetcher::default().with("a", &[404]));
        let result = engine(Arc::clone(&fetcher), 2)
            .retrieve_with_retry("a", &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(fetcher.calls(), 3);
        assert_eq!(result.error, Some(RetrievalError::Status(404)));
    }

    #[tokio::test]
    async fn test_fallback_to_second_endpoint_counts_first_failures() {
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .with("primary", &[500])
                .with("secondary", &[200]),
        );
        let result = engine(fetcher, 2)
            .multi_endpoint_retrieval(&["primary", "secondary"], &CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(result.text(), "secondary:200");
        assert_eq!(result.retry_count, 3);
        assert_eq!(result.endpoint.as_deref(), Some("secondary"));
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .with("one", &[200])
                .with("two", &[200]),
        );
        let result = engine(Arc::clone(&fetcher), 1)
            .multi_endpoint_retrieval(&["one", "two"], &CancellationToken::new())
            .await;

        assert_eq!(result.endpoint.as_deref(), Some("one"));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_endpoints_failed() {
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .with("one", &[500])
                .with("two", &[502]),
        );
        let result = engine(fetcher, 0)
            .multi_endpoint_retrieval(&["one", "two"], &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert_eq!(result.retry_count, 2);
        assert_eq!(
            result.error,
            Some(RetrievalError::AllEndpointsFailed {
                endpoints: 2,
                last_error: Box::new(RetrievalError::Status(502)),
            })
        );
    }

    #[tokio::test]
    async fn test_no_endpoints() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let endpoints: [&str; 0] = [];
        let result = engine(fetcher, 1)
            .multi_endpoint_retrieval(&endpoints, &CancellationToken::new())
            .await;
        assert_eq!(result.error, Some(RetrievalError::NoEndpoints));
    }

    #[tokio::test]
    async fn test_cancel_aborts_retry_delay() {
        let fetcher = Arc::new(ScriptedFetcher::default().with("a", &[500]));
        let config = RetrievalConfig::default()
            .with_max_retries(5)
            .with_retry_delay(Duration::from_secs(60));
        let engine = RetrievalEngine::new(config, fetcher.clone());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            engine.retrieve_with_retry("a", &cancel),
        )
        .await
        .unwrap_or_default();

        assert!(result.is_cancelled());
        assert_eq!(result.retry_count, 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::default().hanging("slow"));
        let engine = engine(fetcher, 3);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine.retrieve_with_retry("slow", &cancel).await;
        assert!(result.is_cancelled());
        assert_eq!(result.retry_count, 0);
    }

    #[tokio::test]
    async fn test_attempt_timeout_is_retryable_failure() {
        let fetcher = Arc::new(ScriptedFetcher::default().hanging("slow"));
        let config = RetrievalConfig::default()
            .with_max_retries(1)
            .with_retry_delay(Duration::from_millis(1))
            .with_timeout(Duration::from_millis(10));
        let result = RetrievalEngine::new(config, fetcher)
            .retrieve_with_retry("slow", &CancellationToken::new())
            .await;

        assert_eq!(result.error, Some(RetrievalError::Timeout));
        assert_eq!(result.retry_count, 2);
    }

    #[tokio::test]
    async fn test_fallback_payload_on_exhaustion() {
        let fetcher = Arc::new(ScriptedFetcher::default().with("a", &[503]));
        let result = engine(fetcher, 1)
            .retrieve_or_fallback(&["a"], Some(b"cached answer".as_slice()), &CancellationToken::new())
            .await;

        assert!(result.success);
        assert!(result.from_fallback);
        assert_eq!(result.status, None);
        assert_eq!(result.text(), "cached answer");
        assert_eq!(result.retry_count, 2);
    }

    #[tokio::test]
    async fn test_fallback_disabled_surfaces_error() {
        let fetcher = Arc::new(ScriptedFetcher::default().with("a", &[503]));
        let config = RetrievalConfig::default()
            .with_max_retries(0)
            .with_fallback(false);
        let result = RetrievalEngine::new(config, fetcher)
            .retrieve_or_fallback(&["a"], Some(b"x".as_slice()), &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert!(matches!(
            result.error,
            Some(RetrievalError::AllEndpointsFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_fallback_never_masks_cancellation() {
        let fetcher = Arc::new(ScriptedFetcher::default().with("a", &[503]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = engine(fetcher, 1)
            .retrieve_or_fallback(&["a"], Some(b"x".as_slice()), &cancel)
            .await;

        assert!(!result.success);
        assert!(result.is_cancelled());
    }
}
