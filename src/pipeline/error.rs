//! Error types for the question pipeline.

use thiserror::Error;

use crate::memory::core::errors::MemoryError;

/// Errors that abort question processing.
///
/// Knowledge-source and answer-generator failures are not represented here:
/// they degrade the answer instead of failing it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The question has neither title nor content.
    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    /// Memory request validation failed.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// The answer generator failed.
    #[error("answer generation failed: {0}")]
    Generation(String),

    /// Invalid pipeline configuration.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// The caller cancelled the request.
    #[error("question processing cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether the error was caused by the caller's input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        match self {
            Self::InvalidQuestion(_) => true,
            Self::Memory(err) => err.is_validation(),
            _ => false,
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
