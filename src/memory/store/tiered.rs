//! In-process two-tier memory store.
//!
//! Both session maps sit behind a single reader/writer lock. Stores, clears,
//! sweeps and retrievals (which bump access counters) take the write lock;
//! statistics take the read lock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::memory::core::config::MemoryConfig;
use crate::memory::core::errors::MemoryResult;
use crate::memory::core::ids::{MemoryId, SessionId, UserId};
use crate::memory::core::item::MemoryItem;
use crate::memory::core::kinds::MemoryType;
use crate::memory::core::metadata::MemoryMetadata;
use crate::memory::store::importance::compute_importance;
use crate::memory::store::query::{MemoryQuery, MemoryStats, RetrievedMemories};
use crate::memory::store::short_term::{ShortTermMemorySession, SlotInsert};
use crate::memory::store::working::{WorkingInsert, WorkingMemorySession};

/// A memory to be stored.
#[derive(Clone, Debug)]
pub struct NewMemory {
    /// Target session.
    pub session_id: SessionId,
    /// Storing user, recorded on session creation.
    pub user_id: Option<UserId>,
    /// Target tier.
    pub memory_type: MemoryType,
    /// Content; identical content is refreshed instead of duplicated.
    pub content: String,
    /// Free-text context.
    pub context: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Priority hint and pass-through values.
    pub metadata: MemoryMetadata,
}

impl NewMemory {
    /// A memory with empty context, tags and metadata.
    #[must_use]
    pub fn new(session_id: SessionId, memory_type: MemoryType, content: impl Into<String>) -> Self {
        Self {
            session_id,
            user_id: None,
            memory_type,
            content: content.into(),
            context: String::new(),
            tags: Vec::new(),
            metadata: MemoryMetadata::default(),
        }
    }

    /// Set the storing user.
    #[must_use]
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Set the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: MemoryMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// What a store call did.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StoreOutcome {
    /// Appended to working memory.
    Appended {
        /// Identifier of the new item.
        id: MemoryId,
        /// Items evicted to restore capacity.
        evicted: usize,
    },
    /// Ranked lowest in a full working memory and dropped straight away.
    Evicted {
        /// Identifier the item would have had.
        id: MemoryId,
        /// Items evicted, the new item included.
        evicted: usize,
    },
    /// Identical content was refreshed in place.
    Updated {
        /// Identifier of the existing item.
        id: MemoryId,
    },
    /// Placed into a short-term slot.
    Slotted {
        /// Identifier of the new item.
        id: MemoryId,
        /// Slot index.
        slot: usize,
        /// Displaced item, if the slot was occupied.
        replaced: Option<MemoryId>,
    },
}

impl StoreOutcome {
    /// Identifier of the stored or refreshed item.
    #[must_use]
    pub const fn id(&self) -> MemoryId {
        match self {
            Self::Appended { id, .. }
            | Self::Evicted { id, .. }
            | Self::Updated { id }
            | Self::Slotted { id, .. } => *id,
        }
    }

    /// Whether the item is held in memory after the call.
    #[must_use]
    pub const fn is_retained(&self) -> bool {
        !matches!(self, Self::Evicted { .. })
    }
}

impl From<WorkingInsert> for StoreOutcome {
    fn from(insert: WorkingInsert) -> Self {
        match insert {
            WorkingInsert::Appended { id, evicted } => Self::Appended { id, evicted },
            WorkingInsert::Evicted { id, evicted } => Self::Evicted { id, evicted },
            WorkingInsert::Updated { id } => Self::Updated { id },
        }
    }
}

impl From<SlotInsert> for StoreOutcome {
    fn from(insert: SlotInsert) -> Self {
        if insert.updated {
            Self::Updated { id: insert.id }
        } else {
            Self::Slotted {
                id: insert.id,
                slot: insert.slot,
                replaced: insert.replaced,
            }
        }
    }
}

/// Statistics from one expiry sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Sessions dropped for exceeding their idle TTL.
    pub sessions_expired: usize,
    /// Items or slots purged past their own expiry.
    pub items_expired: usize,
    /// Time spent holding the lock.
    pub duration: Duration,
}

impl SweepStats {
    /// Whether the sweep removed anything.
    #[must_use]
    pub const fn removed_anything(&self) -> bool {
        self.sessions_expired > 0 || self.items_expired > 0
    }
}

#[derive(Debug, Default)]
struct SessionMaps {
    working: HashMap<SessionId, WorkingMemorySession>,
    short_term: HashMap<SessionId, ShortTermMemorySession>,
}

/// Two-tier, process-lifetime memory store.
#[derive(Debug)]
pub struct MemoryStore {
    config: MemoryConfig,
    maps: RwLock<SessionMaps>,
}

impl MemoryStore {
    /// Create an empty store.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: MemoryConfig) -> MemoryResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            maps: RwLock::new(SessionMaps::default()),
        })
    }

    /// Store configuration.
    #[must_use]
    pub const fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Store a memory now.
    ///
    /// # Errors
    /// Returns an error if the content is empty.
    pub async fn store(&self, memory: NewMemory) -> MemoryResult<StoreOutcome> {
        self.store_at(memory, Utc::now()).await
    }

    /// Store a memory as of `now`.
    ///
    /// # Errors
    /// Returns an error if the content is empty.
    pub async fn store_at(&self, memory: NewMemory, now: DateTime<Utc>) -> MemoryResult<StoreOutcome> {
        let NewMemory {
            session_id,
            user_id,
            memory_type,
            content,
            context,
            tags,
            metadata,
        } = memory;

        let importance = compute_importance(&content, tags.len(), &metadata);
        let ttl = self.tier_ttl(memory_type);
        let item = MemoryItem::new(memory_type, content, context, importance, now)?
            .with_tags(tags)
            .with_metadata(metadata)
            .with_ttl(ttl, now);

        let mut maps = self.maps.write().await;
        let outcome: StoreOutcome = match memory_type {
            MemoryType::Working => {
                let max_items = self.config.working_memory_max_items;
                maps.working
                    .entry(session_id.clone())
                    .or_insert_with(|| WorkingMemorySession::new(user_id, max_items, ttl, now))
                    .insert(item, now)
                    .into()
            }
            MemoryType::ShortTerm => {
                let slots = self.config.short_term_memory_slots;
                maps.short_term
                    .entry(session_id.clone())
                    .or_insert_with(|| ShortTermMemorySession::new(user_id, slots, ttl, now))
                    .insert(item, now)
                    .into()
            }
        };
        drop(maps);

        debug!(session_id = %session_id, %memory_type, ?outcome, "Stored memory");
        Ok(outcome)
    }

    /// Retrieve matching memories now.
    pub async fn retrieve(&self, query: &MemoryQuery) -> RetrievedMemories {
        self.retrieve_at(query, Utc::now()).await
    }

    /// Retrieve matching memories as of `now`.
    ///
    /// Matches are sorted by importance (stable), truncated to the limit, and
    /// each returned item has its access counter bumped. Searching a session
    /// resets its idle timer.
    pub async fn retrieve_at(&self, query: &MemoryQuery, now: DateTime<Utc>) -> RetrievedMemories {
        let filter = query.filter();
        let mut maps = self.maps.write().await;
        let SessionMaps {
            working,
            short_term,
        } = &mut *maps;

        let mut candidates: Vec<&mut MemoryItem> = Vec::new();
        if query.includes(MemoryType::Working)
            && let Some(session) = working.get_mut(&query.session_id)
        {
            session.mark_accessed(now);
            candidates.extend(session.items_mut().filter(|item| filter.matches(item, now)));
        }
        if query.includes(MemoryType::ShortTerm)
            && let Some(session) = short_term.get_mut(&query.session_id)
        {
            session.mark_accessed(now);
            candidates.extend(session.items_mut().filter(|item| filter.matches(item, now)));
        }

        candidates.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        candidates.truncate(query.effective_limit());

        let items: Vec<MemoryItem> = candidates
            .into_iter()
            .map(|item| {
                item.touch(now);
                item.clone()
            })
            .collect();
        drop(maps);

        debug!(session_id = %query.session_id, matches = items.len(), "Retrieved memories");
        RetrievedMemories::new(items)
    }

    /// Usage statistics for a session.
    pub async fn stats(&self, session_id: &SessionId) -> MemoryStats {
        let maps = self.maps.read().await;
        let working = maps.working.get(session_id);
        let short_term = maps.short_term.get(session_id);

        let working_items = working.map_or(0, WorkingMemorySession::len);
        let short_term_items = short_term.map_or(0, ShortTermMemorySession::occupied);

        let total_access_count = working
            .into_iter()
            .flat_map(|session| session.items().iter())
            .chain(short_term.into_iter().flat_map(ShortTermMemorySession::items))
            .map(|item| u64::from(item.access_count))
            .sum();

        let last_access = working
            .map(WorkingMemorySession::last_access)
            .into_iter()
            .chain(short_term.map(ShortTermMemorySession::last_access))
            .max();

        let user_id = working
            .and_then(WorkingMemorySession::user_id)
            .or_else(|| short_term.and_then(ShortTermMemorySession::user_id))
            .map(ToString::to_string);

        let usage_ratio = fraction(
            working_items + short_term_items,
            self.config.total_capacity(),
        );

        MemoryStats {
            session_id: session_id.to_string(),
            user_id,
            working_items,
            short_term_items,
            total_access_count,
            last_access,
            usage_ratio,
        }
    }

    /// Remove a session's tier, or both tiers when `memory_type` is `None`.
    ///
    /// Returns the number of tiers that existed and were removed.
    pub async fn clear(&self, session_id: &SessionId, memory_type: Option<MemoryType>) -> usize {
        let mut maps = self.maps.write().await;
        let mut removed = 0;
        if memory_type.is_none_or(|t| t == MemoryType::Working)
            && maps.working.remove(session_id).is_some()
        {
            removed += 1;
        }
        if memory_type.is_none_or(|t| t == MemoryType::ShortTerm)
            && maps.short_term.remove(session_id).is_some()
        {
            removed += 1;
        }
        drop(maps);

        debug!(session_id = %session_id, ?memory_type, removed, "Cleared memory");
        removed
    }

    /// Run one expiry sweep now.
    pub async fn sweep(&self) -> SweepStats {
        self.sweep_at(Utc::now()).await
    }

    /// Run one expiry sweep as of `now`.
    ///
    /// Sessions idle past their TTL are dropped whole; otherwise only items
    /// past their own expiry are purged.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepStats {
        let start = Instant::now();
        let mut stats = SweepStats::default();
        let mut maps = self.maps.write().await;

        maps.working.retain(|_, session| {
            if session.is_idle(now) {
                stats.sessions_expired += 1;
                return false;
            }
            stats.items_expired += session.purge_expired(now);
            true
        });

        maps.short_term.retain(|_, session| {
            if session.is_idle(now) {
                stats.sessions_expired += 1;
                return false;
            }
            stats.items_expired += session.purge_expired(now);
            true
        });
        drop(maps);

        stats.duration = start.elapsed();
        stats
    }

    /// Number of sessions per tier.
    pub async fn session_counts(&self) -> (usize, usize) {
        let maps = self.maps.read().await;
        (maps.working.len(), maps.short_term.len())
    }

    const fn tier_ttl(&self, memory_type: MemoryType) -> Duration {
        match memory_type {
            MemoryType::Working => self.config.working_memory_ttl,
            MemoryType::ShortTerm => self.config.short_term_memory_ttl,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(used: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    used as f64 / capacity as f64
}
