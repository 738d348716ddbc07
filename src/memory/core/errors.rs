//! Error types for the memory subsystem.

use thiserror::Error;

use crate::memory::core::ids::KeyError;
use crate::memory::core::kinds::MemoryTypeParseError;

/// Memory subsystem error type.
///
/// The store never performs I/O, so every variant is a local validation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The requested tier is not one of `working` or `short_term`.
    #[error("unsupported memory type: {0}")]
    UnsupportedMemoryType(String),
    /// The request carried no session identifier.
    #[error("session id is required")]
    MissingSessionId,
    /// A caller-supplied identifier was rejected.
    #[error("invalid identifier: {0}")]
    InvalidKey(#[from] KeyError),
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Invalid memory item content.
    #[error("invalid memory item: {0}")]
    InvalidMemoryItem(String),
}

impl From<MemoryTypeParseError> for MemoryError {
    fn from(err: MemoryTypeParseError) -> Self {
        Self::UnsupportedMemoryType(err.value().to_string())
    }
}

impl MemoryError {
    /// Whether the error was caused by the caller's input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::InvalidConfig(_))
    }
}

/// Convenience result alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
