//! Fixtures shared by the unit tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use trolley_activity::{ActivityEvent, ActivityFilter, ActivityLog, ActivityLogError};
use trolley_events_memory::MemoryEventBus;
use trolley_storage::{
    Invite, InviteId, ItemId, ItemStatus, List, ListId, ListItem, ListRole, Membership,
    MembershipId, MockStore, UserId,
};
use uuid::Uuid;

use crate::{Core, CoreConfig};

pub(crate) struct NoopActivityLog;

#[async_trait::async_trait]
impl ActivityLog for NoopActivityLog {
    async fn record(&self, _event: ActivityEvent) -> Result<(), ActivityLogError> {
        Ok(())
    }

    async fn list(&self, _filter: ActivityFilter) -> Result<Vec<ActivityEvent>, ActivityLogError> {
        Ok(Vec::new())
    }
}

pub(crate) fn core_with(store: MockStore) -> Core {
    Core::new(
        Arc::new(store),
        Arc::new(MemoryEventBus::new()),
        Arc::new(NoopActivityLog),
        CoreConfig::default(),
    )
}

pub(crate) fn membership(list_id: &ListId, user_id: &UserId, role: ListRole) -> Membership {
    Membership {
        id: MembershipId(Uuid::new_v4()),
        list_id: list_id.clone(),
        user_id: user_id.clone(),
        role,
        joined_at: Utc::now(),
    }
}

pub(crate) fn list(list_id: &ListId, created_by: &UserId) -> List {
    let now = Utc::now();
    List {
        id: list_id.clone(),
        name: "Groceries".to_string(),
        created_by: created_by.clone(),
        created_at: now,
        updated_at: now,
        archived_at: None,
        invite_token: None,
    }
}

pub(crate) fn invite(list_id: &ListId, token: &str, expires_at: DateTime<Utc>) -> Invite {
    Invite {
        id: InviteId(Uuid::new_v4()),
        list_id: list_id.clone(),
        token: token.to_string(),
        created_by: UserId(Uuid::new_v4()),
        created_at: Utc::now(),
        expires_at,
        invalidated_at: None,
    }
}

pub(crate) fn item(list_id: &ListId, added_by: &UserId, status: ItemStatus) -> ListItem {
    let now = Utc::now();
    ListItem {
        id: ItemId(Uuid::new_v4()),
        list_id: list_id.clone(),
        name: "Milk".to_string(),
        description: None,
        status,
        added_by: added_by.clone(),
        assigned_to: None,
        created_at: now,
        updated_at: now,
        completed_at: (status == ItemStatus::Done).then_some(now),
        seq: 1,
    }
}
