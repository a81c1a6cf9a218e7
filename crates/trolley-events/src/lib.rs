//! Event bus abstraction for trolley list item changes.
//!
//! Events are published after an item mutation commits and fanned out to
//! every subscriber of the item's list. Delivery is best-effort: clients
//! treat events as merge hints keyed by item id and refetch on doubt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;
use trolley_storage::{ListId, ListItem};
use uuid::Uuid;

/// Type of item change event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
}

/// Wire form of an item, as carried by events and handed to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub id: Uuid,
    pub list_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub added_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub seq: i64,
}

impl From<&ListItem> for ItemSnapshot {
    fn from(item: &ListItem) -> Self {
        Self {
            id: item.id.0,
            list_id: item.list_id.0,
            name: item.name.clone(),
            description: item.description.clone(),
            status: item.status.as_str().to_string(),
            added_by: item.added_by.0,
            assigned_to: item.assigned_to.as_ref().map(|u| u.0),
            created_at: item.created_at,
            updated_at: item.updated_at,
            completed_at: item.completed_at,
            seq: item.seq,
        }
    }
}

/// Event representing a change to an item of a list
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChangeEvent {
    pub event_type: EventType,
    pub list_id: Uuid,
    pub item_id: Uuid,
    /// Post-change state; absent for deletes
    pub item: Option<ItemSnapshot>,
    pub timestamp: DateTime<Utc>,
}

impl ItemChangeEvent {
    pub fn created(item: &ListItem) -> Self {
        Self::with_snapshot(EventType::Created, item)
    }

    pub fn updated(item: &ListItem) -> Self {
        Self::with_snapshot(EventType::Updated, item)
    }

    pub fn deleted(item: &ListItem) -> Self {
        Self {
            event_type: EventType::Deleted,
            list_id: item.list_id.0,
            item_id: item.id.0,
            item: None,
            timestamp: Utc::now(),
        }
    }

    fn with_snapshot(event_type: EventType, item: &ListItem) -> Self {
        Self {
            event_type,
            list_id: item.list_id.0,
            item_id: item.id.0,
            item: Some(ItemSnapshot::from(item)),
            timestamp: Utc::now(),
        }
    }
}

/// Error type for event bus operations
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("backend error: {0}")]
    Backend(String),
}

/// Stream of item change events
pub type EventStream = Pin<Box<dyn Stream<Item = ItemChangeEvent> + Send>>;

/// Event bus trait for publishing and subscribing to item change events.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an item change to all subscribers of this list.
    ///
    /// Called after an item is created, updated, or deleted.
    async fn publish(&self, list_id: &ListId, event: ItemChangeEvent)
        -> Result<(), EventBusError>;

    /// Subscribe to item change events for a list.
    ///
    /// The stream continues until dropped. Events published before the
    /// subscription are not replayed.
    async fn subscribe(&self, list_id: &ListId) -> Result<EventStream, EventBusError>;

    /// End every open subscription for a list that no longer exists.
    async fn close(&self, list_id: &ListId) -> Result<(), EventBusError>;
}
