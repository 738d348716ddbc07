//! Memory tiers.
//!
//! A memory item lives in exactly one tier:
//! - `working`: a bounded, importance-ranked list per session.
//! - `short_term`: a fixed array of priority slots per session.
//!
//! Identifiers are stable `snake_case` strings used on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Memory tier of a stored item.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Capacity-bounded list evicting the least important items.
    Working,
    /// Fixed slot array replacing the lowest-priority slot.
    ShortTerm,
}

/// Error returned when a tier name is not recognized.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryTypeParseError {
    value: String,
}

impl MemoryTypeParseError {
    /// The rejected input.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for MemoryTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported memory type: {}", self.value)
    }
}

impl std::error::Error for MemoryTypeParseError {}

impl MemoryType {
    /// All tiers, in retrieval order.
    pub const ALL: [Self; 2] = [Self::Working, Self::ShortTerm];

    /// Stable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::ShortTerm => "short_term",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = MemoryTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.eq_ignore_ascii_case("working") {
            Ok(Self::Working)
        } else if raw.eq_ignore_ascii_case("short_term")
            || raw.eq_ignore_ascii_case("short-term")
            || raw.eq_ignore_ascii_case("shortterm")
        {
            Ok(Self::ShortTerm)
        } else {
            Err(MemoryTypeParseError {
                value: raw.to_string(),
            })
        }
    }
}
