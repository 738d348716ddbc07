//! Retrieval engine for knowledge endpoints.
//!
//! Fetches content with a fixed-delay retry policy per endpoint, falls through
//! an ordered endpoint list until one succeeds, and can substitute a static
//! fallback payload once every endpoint is exhausted.

pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod result;

pub use config::RetrievalConfig;
pub use engine::RetrievalEngine;
pub use error::{RetrievalError, is_retryable_status, is_success_status};
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher};
pub use result::RetrievalResult;
