//! Working memory: a bounded, importance-ranked list per session.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::memory::core::ids::{MemoryId, UserId};
use crate::memory::core::item::MemoryItem;

/// Result of inserting into a working-memory session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkingInsert {
    /// A new item was appended; `evicted` items were dropped to restore capacity.
    Appended {
        /// Identifier of the appended item.
        id: MemoryId,
        /// Number of items evicted by the batch eviction.
        evicted: usize,
    },
    /// The new item ranked lowest and was dropped by the batch eviction it
    /// triggered.
    Evicted {
        /// Identifier the item would have had.
        id: MemoryId,
        /// Number of items evicted, the new item included.
        evicted: usize,
    },
    /// An item with identical content was updated in place.
    Updated {
        /// Identifier of the existing item.
        id: MemoryId,
    },
}

/// Working memory for one session.
#[derive(Clone, Debug)]
pub struct WorkingMemorySession {
    user_id: Option<UserId>,
    items: Vec<MemoryItem>,
    max_items: usize,
    ttl: Duration,
    last_access: DateTime<Utc>,
}

impl WorkingMemorySession {
    /// Create an empty session.
    #[must_use]
    pub const fn new(
        user_id: Option<UserId>,
        max_items: usize,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            max_items,
            ttl,
            last_access: now,
        }
    }

    /// Insert an item, or update the existing item with identical content.
    ///
    /// After the call `len() <= max_items` holds: on overflow the least
    /// important items are dropped in one batch.
    pub fn insert(&mut self, item: MemoryItem, now: DateTime<Utc>) -> WorkingInsert {
        self.last_access = now;

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.content == item.content && !i.is_expired(now))
        {
            refresh_in_place(existing, item, now);
            return WorkingInsert::Updated { id: existing.id };
        }

        let id = item.id;
        self.items.push(item);
        let evicted = self.evict_overflow();
        if self.items.iter().any(|stored| stored.id == id) {
            WorkingInsert::Appended { id, evicted }
        } else {
            WorkingInsert::Evicted { id, evicted }
        }
    }

    fn evict_overflow(&mut self) -> usize {
        if self.items.len() <= self.max_items {
            return 0;
        }

        let excess = self.items.len() - self.max_items;
        self.items
            .sort_by(|a, b| a.importance.total_cmp(&b.importance));
        self.items.drain(..excess);
        excess
    }

    /// Drop items whose own expiry has passed. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.is_expired(now));
        before - self.items.len()
    }

    /// Whether the session has been idle for longer than its TTL.
    #[must_use]
    pub fn is_idle(&self, now: DateTime<Utc>) -> bool {
        is_idle(self.last_access, self.ttl, now)
    }

    /// Reset the idle timer.
    pub const fn mark_accessed(&mut self, now: DateTime<Utc>) {
        self.last_access = now;
    }

    /// Last store or retrieve on this session.
    #[must_use]
    pub const fn last_access(&self) -> DateTime<Utc> {
        self.last_access
    }

    /// User recorded when the session was created.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    /// Stored items, in no particular order.
    #[must_use]
    pub fn items(&self) -> &[MemoryItem] {
        &self.items
    }

    /// Mutable access for retrieval bookkeeping.
    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut MemoryItem> {
        self.items.iter_mut()
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the session holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub const fn max_items(&self) -> usize {
        self.max_items
    }
}

/// Re-store of identical content: newer importance, context, metadata and
/// expiry win; tags are unioned; the access counter is bumped.
pub(crate) fn refresh_in_place(existing: &mut MemoryItem, incoming: MemoryItem, now: DateTime<Utc>) {
    existing.importance = incoming.importance;
    if !incoming.context.is_empty() {
        existing.context = incoming.context;
    }
    existing.tags.extend(incoming.tags);
    existing.metadata.merge(incoming.metadata);
    existing.expires_at = incoming.expires_at;
    existing.touch(now);
}

pub(crate) fn is_idle(last_access: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let idle = now.signed_duration_since(last_access);
    idle.to_std().is_ok_and(|idle| idle > ttl)
}
