//! Two-tier session memory: working memory and short-term slots.

pub mod importance;
pub mod query;
pub mod short_term;
pub mod tiered;
pub mod working;

pub use importance::compute_importance;
pub use query::{DEFAULT_LIMIT, MemoryQuery, MemoryStats, RetrievedMemories};
pub use short_term::{PrioritySlot, ShortTermMemorySession, SlotInsert};
pub use tiered::{MemoryStore, NewMemory, StoreOutcome, SweepStats};
pub use working::{WorkingInsert, WorkingMemorySession};
