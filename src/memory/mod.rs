//! Session memory for the agent.
//!
//! - `core`: configuration, errors, identifiers, tiers, items and metadata
//! - `store`: the two-tier in-memory store (working list and short-term slots)
//! - `maintenance`: background expiry sweep
//! - `engine`: validated store/retrieve/stats/clear operations

pub mod core;
pub mod engine;
pub mod maintenance;
pub mod store;

pub use core::{
    KeyError, MemoryConfig, MemoryError, MemoryId, MemoryItem, MemoryMetadata, MemoryResult,
    MemoryType, Priority, SessionId, UserId,
};
pub use engine::{MemoryEngine, RetrieveMemoryRequest, RetrieveMemoryResponse, StoreMemoryRequest};
pub use maintenance::{BackgroundCleanup, CleanupConfig, CleanupHandle};
pub use store::{
    MemoryQuery, MemoryStats, MemoryStore, NewMemory, RetrievedMemories, StoreOutcome, SweepStats,
    compute_importance,
};
