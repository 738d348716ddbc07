//! Core memory types and identifiers.

pub mod config;
pub mod errors;
pub mod ids;
pub mod item;
pub mod kinds;
pub mod metadata;

pub use config::MemoryConfig;
pub use errors::{MemoryError, MemoryResult};
pub use ids::{KeyError, MemoryId, SessionId, UserId};
pub use item::{MemoryItem, clamp_unit, normalize_tags};
pub use kinds::{MemoryType, MemoryTypeParseError};
pub use metadata::{MemoryMetadata, Priority};
