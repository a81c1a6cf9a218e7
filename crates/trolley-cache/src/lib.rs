//! Client-side cache of list items.
//!
//! A full fetch seeds a list with [`ListCache::replace`]; afterwards change
//! events are folded in with [`ListCache::apply`]. Events may arrive late,
//! twice, or out of order, so merging is idempotent:
//!
//! - a snapshot only overwrites an entry whose `updated_at` is not newer,
//! - a delete leaves a tombstone so stale created/updated events cannot
//!   bring the item back.
//!
//! Tombstones are kept for [`TOMBSTONE_RETENTION_SECS`] behind the newest
//! change seen on the list, and at most [`MAX_TOMBSTONES`] per list. Once a
//! tombstone is dropped, snapshots of unknown items at or before its time
//! are treated as stale.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use trolley_events::{EventType, ItemChangeEvent, ItemSnapshot};
use uuid::Uuid;

/// What `apply` did with an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    /// Older than what the cache holds, or about a deleted item.
    Stale,
    /// The list isn't cached; the event was dropped.
    UnknownList,
    /// A created/updated event without a snapshot. Refetch the list.
    NeedsResync,
}

pub const TOMBSTONE_RETENTION_SECS: i64 = 600;
pub const MAX_TOMBSTONES: usize = 1024;

#[derive(Default)]
struct CachedList {
    items: HashMap<Uuid, ItemSnapshot>,
    tombstones: HashMap<Uuid, DateTime<Utc>>,
    /// Latest change time applied to this list.
    newest: Option<DateTime<Utc>>,
    /// Latest deletion time whose tombstone has been pruned.
    floor: Option<DateTime<Utc>>,
}

impl CachedList {
    fn observe(&mut self, at: DateTime<Utc>) {
        self.newest = Some(self.newest.map_or(at, |n| n.max(at)));
    }

    fn drop_tombstones_before(&mut self, cutoff: DateTime<Utc>) {
        let mut pruned = None;
        self.tombstones.retain(|_, at| {
            if *at < cutoff {
                pruned = Some(pruned.map_or(*at, |p: DateTime<Utc>| p.max(*at)));
                false
            } else {
                true
            }
        });
        if let Some(at) = pruned {
            self.floor = Some(self.floor.map_or(at, |f| f.max(at)));
        }
    }

    fn prune_tombstones(&mut self) {
        if let Some(newest) = self.newest {
            self.drop_tombstones_before(newest - Duration::seconds(TOMBSTONE_RETENTION_SECS));
        }
        if self.tombstones.len() > MAX_TOMBSTONES {
            let mut times: Vec<DateTime<Utc>> = self.tombstones.values().copied().collect();
            times.sort_unstable();
            let cutoff = times[times.len() - MAX_TOMBSTONES];
            self.drop_tombstones_before(cutoff);
        }
    }
}

#[derive(Default)]
pub struct ListCache {
    lists: HashMap<Uuid, CachedList>,
}

impl ListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or reseed) a list from a full fetch.
    pub fn replace(&mut self, list_id: Uuid, items: Vec<ItemSnapshot>) {
        let entry = self.lists.entry(list_id).or_default();
        entry.items = items.into_iter().map(|i| (i.id, i)).collect();
        // Anything the server still returns is alive.
        let CachedList {
            items, tombstones, ..
        } = entry;
        tombstones.retain(|id, _| !items.contains_key(id));
    }

    pub fn apply(&mut self, event: &ItemChangeEvent) -> MergeOutcome {
        let Some(list) = self.lists.get_mut(&event.list_id) else {
            return MergeOutcome::UnknownList;
        };

        match event.event_type {
            EventType::Deleted => {
                list.items.remove(&event.item_id);
                list.tombstones
                    .entry(event.item_id)
                    .and_modify(|at| *at = (*at).max(event.timestamp))
                    .or_insert(event.timestamp);
                list.observe(event.timestamp);
                list.prune_tombstones();
                MergeOutcome::Applied
            }
            EventType::Created | EventType::Updated => {
                let Some(snapshot) = &event.item else {
                    tracing::debug!(item_id = %event.item_id, "change event without snapshot");
                    return MergeOutcome::NeedsResync;
                };
                if list.tombstones.contains_key(&snapshot.id) {
                    return MergeOutcome::Stale;
                }
                match list.items.get(&snapshot.id) {
                    Some(current) if current.updated_at > snapshot.updated_at => {
                        return MergeOutcome::Stale;
                    }
                    // Possibly deleted, with its tombstone already pruned.
                    None if list.floor.is_some_and(|f| snapshot.updated_at <= f) => {
                        return MergeOutcome::Stale;
                    }
                    _ => {}
                }
                list.items.insert(snapshot.id, snapshot.clone());
                list.observe(snapshot.updated_at);
                list.prune_tombstones();
                MergeOutcome::Applied
            }
        }
    }

    /// Items of a list ordered by `created_at`, then `seq`. `None` if not cached.
    pub fn items(&self, list_id: &Uuid) -> Option<Vec<ItemSnapshot>> {
        let list = self.lists.get(list_id)?;
        let mut items: Vec<ItemSnapshot> = list.items.values().cloned().collect();
        items.sort_by(|a, b| (a.created_at, a.seq).cmp(&(b.created_at, b.seq)));
        Some(items)
    }

    pub fn get(&self, list_id: &Uuid, item_id: &Uuid) -> Option<&ItemSnapshot> {
        self.lists.get(list_id)?.items.get(item_id)
    }

    /// Forget a list, e.g. after leaving it.
    pub fn evict(&mut self, list_id: &Uuid) -> bool {
        self.lists.remove(list_id).is_some()
    }

    pub fn contains(&self, list_id: &Uuid) -> bool {
        self.lists.contains_key(list_id)
    }

    pub fn tombstone_count(&self, list_id: &Uuid) -> usize {
        self.lists.get(list_id).map_or(0, |l| l.tombstones.len())
    }
}
