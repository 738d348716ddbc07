//! Identifier types for the conversational memory store.
//!
//! Memory items get generated UUID identifiers. Sessions and users are keyed by
//! identifiers supplied by the caller, so those are validated string newtypes.
//!
//! ## Cargo features used by this module
//! - `uuid_v7`: enables `UUIDv7` generation via `uuid/v7`.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate an ID with good insert locality.
///
/// With feature `uuid_v7` enabled, this uses `Uuid::now_v7()`.
/// Otherwise it falls back to `Uuid::new_v4()`.
#[inline]
#[must_use]
fn uuid_time_ordered() -> Uuid {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4()
    }
}

/// Identifier for a stored memory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MemoryId(pub Uuid);

impl Default for MemoryId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryId {
    /// Create a new identifier.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(uuid_time_ordered())
    }

    /// Borrow the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemoryId {
    type Err = uuid::Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Errors returned when parsing a caller-supplied key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Empty (or whitespace-only) identifier.
    Empty,
    /// Exceeds the maximum accepted length.
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        got: usize,
    },
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "identifier must not be empty"),
            Self::TooLong { max, got } => write!(f, "identifier too long: got {got}, max {max}"),
        }
    }
}

impl std::error::Error for KeyError {}

/// Declare a caller-supplied string key with a consistent API.
macro_rules! define_string_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Hard ceiling to prevent pathological payloads.
            pub const MAX_LEN: usize = 256;

            /// Build a validated key (trimmed, non-empty, bounded length).
            ///
            /// # Errors
            /// Returns `KeyError` if the input is empty or too long.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, KeyError> {
                let s = raw.as_ref().trim();
                if s.is_empty() {
                    return Err(KeyError::Empty);
                }
                if s.len() > Self::MAX_LEN {
                    return Err(KeyError::TooLong {
                        max: Self::MAX_LEN,
                        got: s.len(),
                    });
                }
                Ok(Self(s.to_owned()))
            }

            /// Borrow as `&str`.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = KeyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_key!(
    /// Identifier for a conversation session.
    ///
    /// Both memory tiers are keyed by this value; reuse it across requests to
    /// share memory between them.
    SessionId
);

define_string_key!(
    /// Identifier of the user owning a session.
    UserId
);
