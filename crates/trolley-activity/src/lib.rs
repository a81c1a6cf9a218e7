//! Activity log abstraction for trolley.
//!
//! This crate defines the `ActivityLog` trait for persisting what happened on a
//! list (items added, members leaving, invites rotated) and the event types
//! shown in a list's activity feed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trolley_storage::{ItemId, ListId, UserId};
use uuid::Uuid;

/// Unique identifier for an activity entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityId(pub Uuid);

impl ActivityId {
    /// Generate a new activity ID using UUID v7 (time-ordered)
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ActivityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ActivityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Kinds of list activity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    ListCreated,
    ItemCreated,
    ItemUpdated,
    ItemCompleted,
    ItemDeleted,
    MemberAdded,
    MemberRemoved,
    MemberLeft,
    InviteRotated,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::ListCreated => "list_created",
            ActivityType::ItemCreated => "item_created",
            ActivityType::ItemUpdated => "item_updated",
            ActivityType::ItemCompleted => "item_completed",
            ActivityType::ItemDeleted => "item_deleted",
            ActivityType::MemberAdded => "member_added",
            ActivityType::MemberRemoved => "member_removed",
            ActivityType::MemberLeft => "member_left",
            ActivityType::InviteRotated => "invite_rotated",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list_created" => Ok(ActivityType::ListCreated),
            "item_created" => Ok(ActivityType::ItemCreated),
            "item_updated" => Ok(ActivityType::ItemUpdated),
            "item_completed" => Ok(ActivityType::ItemCompleted),
            "item_deleted" => Ok(ActivityType::ItemDeleted),
            "member_added" => Ok(ActivityType::MemberAdded),
            "member_removed" => Ok(ActivityType::MemberRemoved),
            "member_left" => Ok(ActivityType::MemberLeft),
            "invite_rotated" => Ok(ActivityType::InviteRotated),
            _ => Err(format!("unknown activity type: {}", s)),
        }
    }
}

/// A single entry in a list's activity feed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: ActivityId,
    pub list_id: Uuid,
    /// User who performed the action
    pub user_id: Uuid,
    pub activity_type: ActivityType,
    pub target_item_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    /// Free-form context, e.g. item name or new status
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn builder(list_id: &ListId, user_id: &UserId, kind: ActivityType) -> ActivityEventBuilder {
        ActivityEventBuilder::new(list_id, user_id, kind)
    }

    pub fn get_list_id(&self) -> ListId {
        ListId(self.list_id)
    }

    pub fn get_user_id(&self) -> UserId {
        UserId(self.user_id)
    }
}

/// Builder for constructing activity events
pub struct ActivityEventBuilder {
    list_id: Uuid,
    user_id: Uuid,
    activity_type: ActivityType,
    target_item_id: Option<Uuid>,
    target_user_id: Option<Uuid>,
    details: Option<serde_json::Value>,
}

impl ActivityEventBuilder {
    pub fn new(list_id: &ListId, user_id: &UserId, activity_type: ActivityType) -> Self {
        Self {
            list_id: list_id.0,
            user_id: user_id.0,
            activity_type,
            target_item_id: None,
            target_user_id: None,
            details: None,
        }
    }

    pub fn target_item(mut self, item_id: &ItemId) -> Self {
        self.target_item_id = Some(item_id.0);
        self
    }

    pub fn target_user(mut self, user_id: &UserId) -> Self {
        self.target_user_id = Some(user_id.0);
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn build(self) -> ActivityEvent {
        ActivityEvent {
            id: ActivityId::new(),
            list_id: self.list_id,
            user_id: self.user_id,
            activity_type: self.activity_type,
            target_item_id: self.target_item_id,
            target_user_id: self.target_user_id,
            details: self.details,
            created_at: Utc::now(),
        }
    }
}

/// Filter for querying a list's activity
#[derive(Clone, Debug)]
pub struct ActivityFilter {
    pub list_id: ListId,
    /// Only entries performed by this user
    pub user_id: Option<UserId>,
    pub activity_type: Option<ActivityType>,
    /// Entries strictly older than this (for paging backwards)
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl ActivityFilter {
    pub fn for_list(list_id: ListId) -> Self {
        Self {
            list_id,
            user_id: None,
            activity_type: None,
            before: None,
            limit: None,
        }
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn activity_type(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    pub fn before(mut self, before: DateTime<Utc>) -> Self {
        self.before = Some(before);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Error type for activity log operations
#[derive(Debug, Error)]
pub enum ActivityLogError {
    #[error("database error: {0}")]
    Database(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

/// Trait for activity persistence.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    /// Record an activity event.
    ///
    /// Called after the mutation it describes has committed. Callers log
    /// failures instead of failing the request.
    async fn record(&self, event: ActivityEvent) -> Result<(), ActivityLogError>;

    /// Query a list's activity, newest first.
    async fn list(&self, filter: ActivityFilter) -> Result<Vec<ActivityEvent>, ActivityLogError>;
}
