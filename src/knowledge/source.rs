//! Knowledge source abstraction.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::fusion::types::KnowledgeItem;
use crate::pipeline::question::Question;
use crate::retrieval::error::RetrievalError;

/// Errors raised by a knowledge source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    /// Remote retrieval failed after retries.
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    /// Payload could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Index data could not be loaded.
    #[error("Index error: {0}")]
    Index(String),

    /// The caller cancelled the request.
    #[error("Knowledge lookup cancelled")]
    Cancelled,
}

impl KnowledgeError {
    /// Whether this error is a cancellation, directly or via retrieval.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Retrieval(RetrievalError::Cancelled))
    }
}

/// Result type for knowledge sources.
pub type KnowledgeResult<T> = Result<T, KnowledgeError>;

/// A source of knowledge items for a question.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Short tag identifying the source in logs and results.
    fn name(&self) -> &str;

    /// Look up knowledge for `question`.
    async fn fetch(&self, question: &Question, cancel: &CancellationToken) -> KnowledgeResult<Vec<KnowledgeItem>>;
}
