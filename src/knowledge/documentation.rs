//! Documentation lookups over HTTP endpoints.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::fusion::types::KnowledgeItem;
use crate::knowledge::source::{KnowledgeError, KnowledgeResult, KnowledgeSource};
use crate::pipeline::question::Question;
use crate::retrieval::engine::RetrievalEngine;
use crate::retrieval::error::RetrievalError;

/// Source tag of [`DocumentationSource`] items.
pub const DOCUMENTATION_SOURCE: &str = "documentation";

/// Placeholder replaced by the percent-encoded query in endpoint templates.
pub const QUERY_PLACEHOLDER: &str = "{query}";

const MAX_QUERY_KEYWORDS: usize = 8;
const DEFAULT_MAX_CHARS: usize = 4_000;

/// Selectors tried in order for the main text.
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role='main']",
    ".content",
    "#content",
    "body",
];

/// Fetches a documentation page through the retrieval engine.
///
/// Endpoints are URL templates tried in order; the first successful payload
/// becomes a single knowledge item. When every endpoint fails the optional
/// fallback text is used instead.
#[derive(Clone, Debug)]
pub struct DocumentationSource {
    engine: RetrievalEngine,
    endpoints: Vec<String>,
    fallback: Option<String>,
    max_chars: usize,
}

impl DocumentationSource {
    /// Create a source over `endpoints`.
    #[must_use]
    pub const fn new(engine: RetrievalEngine, endpoints: Vec<String>) -> Self {
        Self {
            engine,
            endpoints,
            fallback: None,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    /// Text used when every endpoint fails.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Truncate extracted text to `max_chars` characters.
    #[must_use]
    pub const fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Expand the endpoint templates for `question`.
    #[must_use]
    pub fn endpoints_for(&self, question: &Question) -> Vec<String> {
        let keywords = question.keywords(MAX_QUERY_KEYWORDS);
        let query = if keywords.is_empty() {
            question.text()
        } else {
            keywords.join(" ")
        };
        let encoded = urlencoding::encode(&query);
        self.endpoints
            .iter()
            .map(|template| template.replace(QUERY_PLACEHOLDER, &encoded))
            .collect()
    }
}

#[async_trait]
impl KnowledgeSource for DocumentationSource {
    fn name(&self) -> &str {
        DOCUMENTATION_SOURCE
    }

    async fn fetch(&self, question: &Question, cancel: &CancellationToken) -> KnowledgeResult<Vec<KnowledgeItem>> {
        if self.endpoints.is_empty() && self.fallback.is_none() {
            return Ok(Vec::new());
        }

        let endpoints = self.endpoints_for(question);
        let result = self
            .engine
            .retrieve_or_fallback(&endpoints, self.fallback.as_deref().map(str::as_bytes), cancel)
            .await;

        if result.is_cancelled() {
            return Err(KnowledgeError::Cancelled);
        }
        if !result.success {
            return Err(result.error.unwrap_or(RetrievalError::NoEndpoints).into());
        }

        if result.from_fallback {
            warn!(retry_count = result.retry_count, "Documentation endpoints failed, using fallback");
        }

        let page = extract_page(&result.text(), self.max_chars);
        if page.text.is_empty() {
            debug!(endpoint = ?result.endpoint, "Documentation payload had no text");
            return Ok(Vec::new());
        }

        let title = page.title.unwrap_or_else(|| "Documentation".to_string());
        let mut item = KnowledgeItem::new(DOCUMENTATION_SOURCE, title, page.text)
            .with_metadata("retry_count", Value::from(result.retry_count))
            .with_metadata("from_fallback", Value::from(result.from_fallback));
        item.url = result.endpoint;
        Ok(vec![item])
    }
}

/// Title and main text extracted from a payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Page title, if the payload was HTML and had one.
    pub title: Option<String>,
    /// Whitespace-normalized text.
    pub text: String,
}

/// Extract the title and main text. Non-HTML payloads are treated as plain text.
#[must_use]
pub fn extract_page(payload: &str, max_chars: usize) -> ExtractedPage {
    if !looks_like_html(payload) {
        return ExtractedPage {
            title: None,
            text: truncate_chars(&clean_text(payload), max_chars),
        };
    }

    let document = Html::parse_document(payload);
    ExtractedPage {
        title: extract_title(&document),
        text: truncate_chars(&extract_main_text(&document), max_chars),
    }
}

fn looks_like_html(payload: &str) -> bool {
    let head: String = payload.trim_start().chars().take(512).collect::<String>().to_lowercase();
    head.starts_with('<') && (head.contains("<html") || head.contains("<!doctype") || head.contains("<body") || head.contains("<p"))
}

fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        let text = clean_text(&document.select(&selector).next()?.text().collect::<String>());
        (!text.is_empty()).then_some(text)
    })
}

fn extract_main_text(document: &Html) -> String {
    CONTENT_SELECTORS
        .iter()
        .filter_map(|raw| Selector::parse(raw).ok())
        .find_map(|selector| {
            let element = document.select(&selector).next()?;
            let text = clean_text(&element.text().collect::<Vec<_>>().join(" "));
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_default()
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::retrieval::config::RetrievalConfig;
    use crate::retrieval::fetcher::{FetchResponse, Fetcher};

    struct StaticFetcher {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        fn new(status: u16, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, endpoint: &str) -> Result<FetchResponse, RetrievalError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(endpoint.to_string());
            }
            Ok(FetchResponse::new(self.status, self.body))
        }
    }

    fn engine(fetcher: Arc<StaticFetcher>) -> RetrievalEngine {
        let config = RetrievalConfig::default()
            .with_max_retries(1)
            .with_retry_delay(Duration::from_millis(1));
        RetrievalEngine::new(config, fetcher)
    }

    const PAGE: &str = "<!DOCTYPE html><html><head><title>Gateway routing</title></head>\
        <body><nav>menu</nav><main><h1>Routes</h1><p>A 404 means the route\n   is not registered.</p></main></body></html>";

    #[test]
    fn test_extracts_title_and_main_text() {
        let page = extract_page(PAGE, 1_000);
        assert_eq!(page.title.as_deref(), Some("Gateway routing"));
        assert_eq!(page.text, "Routes A 404 means the route is not registered.");
    }

    #[test]
    fn test_plain_text_payload() {
        let page = extract_page("  plain\n\ntext  body ", 1_000);
        assert_eq!(page, ExtractedPage { title: None, text: "plain text body".to_string() });
        assert_eq!(extract_page("abcdef", 3).text, "abc");
    }

    #[test]
    fn test_query_is_percent_encoded() {
        let source = DocumentationSource::new(
            engine(StaticFetcher::new(200, "")),
            vec!["https://docs.example/search?q={query}".to_string()],
        );
        let endpoints = source.endpoints_for(&Question::new("Gateway 404", "route & path"));
        assert_eq!(endpoints, vec!["https://docs.example/search?q=gateway%20404%20route%20path"]);
    }

    #[tokio::test]
    async fn test_fetch_builds_item_from_page() {
        let fetcher = StaticFetcher::new(200, PAGE);
        let source = DocumentationSource::new(
            engine(Arc::clone(&fetcher)),
            vec!["https://docs.example/{query}".to_string()],
        );
        let items = source
            .fetch(&Question::new("Gateway", "404"), &CancellationToken::new())
            .await
            .unwrap_or_default();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, DOCUMENTATION_SOURCE);
        assert_eq!(items[0].title, "Gateway routing");
        assert_eq!(items[0].url.as_deref(), Some("https://docs.example/gateway%20404"));
    }

    #[tokio::test]
    async fn test_fetch_uses_fallback_when_endpoints_fail() {
        let source = DocumentationSource::new(
            engine(StaticFetcher::new(503, "")),
            vec!["https://docs.example/{query}".to_string()],
        )
        .with_fallback("Check the status page for ongoing incidents.");

        let items = source
            .fetch(&Question::new("Outage", "site down"), &CancellationToken::new())
            .await
            .unwrap_or_default();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "Check the status page for ongoing incidents.");
        assert_eq!(items[0].url, None);
        assert_eq!(items[0].metadata.get("from_fallback"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_fetch_without_fallback_reports_error() {
        let source = DocumentationSource::new(
            engine(StaticFetcher::new(404, "")),
            vec!["https://docs.example/{query}".to_string()],
        );
        let result = source
            .fetch(&Question::new("Missing", "page"), &CancellationToken::new())
            .await;
        assert!(matches!(
            result,
            Err(KnowledgeError::Retrieval(RetrievalError::AllEndpointsFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_no_endpoints_and_no_fallback_yields_nothing() {
        let source = DocumentationSource::new(engine(StaticFetcher::new(200, PAGE)), Vec::new());
        let items = source
            .fetch(&Question::new("a", "b"), &CancellationToken::new())
            .await;
        assert_eq!(items, Ok(Vec::new()));
    }
}
