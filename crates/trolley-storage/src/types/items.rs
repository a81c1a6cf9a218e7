//! List item types.

use chrono::{DateTime, Utc};

use super::{ItemId, ItemStatus, ListId, UserId};

/// List item record
#[derive(Clone, Debug)]
pub struct ListItem {
    pub id: ItemId,
    pub list_id: ListId,
    pub name: String,
    pub description: Option<String>,
    pub status: ItemStatus,
    pub added_by: UserId,
    pub assigned_to: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>, // Set iff status is Done
    pub seq: i64,                            // Insertion order, breaks created_at ties
}

/// Parameters for creating a list item (always starts Open)
#[derive(Clone, Debug)]
pub struct CreateItemParams {
    pub list_id: ListId,
    pub name: String,
    pub description: Option<String>,
    pub added_by: UserId,
    pub assigned_to: Option<UserId>,
}

/// Parameters for changing an item's status
#[derive(Clone, Debug)]
pub struct UpdateItemStatusParams {
    pub item_id: ItemId,
    pub status: ItemStatus,
    pub completed_at: Option<DateTime<Utc>>,
}
