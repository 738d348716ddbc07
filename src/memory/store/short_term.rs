//! Short-term memory: a fixed array of priority slots per session.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::memory::core::ids::{MemoryId, UserId};
use crate::memory::core::item::MemoryItem;
use crate::memory::store::working::{is_idle, refresh_in_place};

/// An occupied slot.
#[derive(Clone, Debug)]
pub struct PrioritySlot {
    /// Stored item.
    pub item: MemoryItem,
    /// Frozen at insertion: `importance * 100 + access_count`.
    pub priority: i64,
}

impl PrioritySlot {
    fn new(item: MemoryItem) -> Self {
        let priority = item.slot_priority();
        Self { item, priority }
    }
}

/// Result of inserting into a short-term session. Exactly one slot changes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SlotInsert {
    /// Identifier of the item now occupying the slot.
    pub id: MemoryId,
    /// Index of the slot that changed.
    pub slot: usize,
    /// Identifier of the item that was displaced, if any.
    pub replaced: Option<MemoryId>,
    /// Whether identical content was refreshed in place.
    pub updated: bool,
}

/// Short-term memory for one session.
#[derive(Clone, Debug)]
pub struct ShortTermMemorySession {
    user_id: Option<UserId>,
    slots: Vec<Option<PrioritySlot>>,
    ttl: Duration,
    last_access: DateTime<Utc>,
}

impl ShortTermMemorySession {
    /// Create a session with `max_slots` empty slots (at least one).
    #[must_use]
    pub fn new(
        user_id: Option<UserId>,
        max_slots: usize,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let mut slots = Vec::with_capacity(max_slots.max(1));
        slots.resize_with(max_slots.max(1), || None);
        Self {
            user_id,
            slots,
            ttl,
            last_access: now,
        }
    }

    /// Place an item into a slot.
    ///
    /// Identical content is refreshed in its current slot. Otherwise the first
    /// empty slot is used, and when none is empty the slot with the lowest
    /// priority is replaced (the first one wins on ties).
    pub fn insert(&mut self, item: MemoryItem, now: DateTime<Utc>) -> SlotInsert {
        self.last_access = now;

        if let Some((index, slot)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find_map(|(index, slot)| {
                slot.as_mut()
                    .filter(|s| s.item.content == item.content && !s.item.is_expired(now))
                    .map(|s| (index, s))
            })
        {
            refresh_in_place(&mut slot.item, item, now);
            slot.priority = slot.item.slot_priority();
            return SlotInsert {
                id: slot.item.id,
                slot: index,
                replaced: None,
                updated: true,
            };
        }

        let index = self.target_slot();
        let id = item.id;
        let replaced = self.slots[index]
            .replace(PrioritySlot::new(item))
            .map(|previous| previous.item.id);

        SlotInsert {
            id,
            slot: index,
            replaced,
            updated: false,
        }
    }

    fn target_slot(&self) -> usize {
        if let Some(empty) = self.slots.iter().position(Option::is_none) {
            return empty;
        }

        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|s| (index, s.priority)))
            .min_by_key(|(_, priority)| *priority)
            .map_or(0, |(index, _)| index)
    }

    /// Empty slots whose item has expired. Returns how many were cleared.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|s| s.item.is_expired(now)) {
                *slot = None;
                purged += 1;
            }
        }
        purged
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

    /// All slots, occupied or not.
    #[must_use]
    pub fn slots(&self) -> &[Option<PrioritySlot>] {
        &self.slots
    }

    /// Items in occupied slots.
    pub fn items(&self) -> impl Iterator<Item = &MemoryItem> {
        self.slots.iter().flatten().map(|slot| &slot.item)
    }

    /// Mutable access for retrieval bookkeeping. Priorities stay frozen.
    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut MemoryItem> {
        self.slots.iter_mut().flatten().map(|slot| &mut slot.item)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Fixed slot count.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
