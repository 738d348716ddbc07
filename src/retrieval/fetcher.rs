//! Single-attempt endpoint fetchers.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use url::Url;

use crate::retrieval::config::RetrievalConfig;
use crate::retrieval::error::RetrievalError;

/// Raw response from one attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Build a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Performs one attempt against an endpoint. Retry policy lives in the engine.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `endpoint` once.
    async fn fetch(&self, endpoint: &str) -> Result<FetchResponse, RetrievalError>;
}

/// `reqwest`-backed fetcher.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from the retrieval configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| RetrievalError::HttpClient(e.to_string()))?;
        headers.insert(USER_AGENT, agent);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,text/plain;q=0.8,*/*;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| RetrievalError::HttpClient(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, endpoint: &str) -> Result<FetchResponse, RetrievalError> {
        let url = Url::parse(endpoint).map_err(|e| RetrievalError::InvalidUrl(format!("{endpoint}: {e}")))?;
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(FetchResponse { status, body })
    }
}
