//! Item lifecycle: add, list, delete, change status.

use chrono::Utc;
use trolley_activity::{ActivityEvent, ActivityType};
use trolley_events::ItemChangeEvent;
use trolley_storage::{
    CreateItemParams, ItemId, ItemStatus, ListId, ListItem, StoreError, UpdateItemStatusParams,
    UserId,
};

use crate::error::store_err;
use crate::{Core, CoreError, DenyReason};

/// Input for `add_item`.
#[derive(Clone, Debug)]
pub struct NewItem {
    pub list_id: ListId,
    pub name: String,
    pub description: Option<String>,
    pub assigned_to: Option<UserId>,
}

impl Core {
    pub async fn add_item(&self, item: NewItem, user_id: &UserId) -> Result<ListItem, CoreError> {
        self.require(user_id, &item.list_id, None).await?;

        let name = item.name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("Item name is required"));
        }
        let description = item
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        if let Some(assignee) = &item.assigned_to {
            match self.store.get_membership(&item.list_id, assignee).await {
                Ok(_) => {}
                Err(StoreError::NotFound) => {
                    return Err(CoreError::validation(
                        "Assignee is not a member of this list",
                    ))
                }
                Err(e) => return Err(store_err("get_membership")(e)),
            }
        }

        let created = match self
            .store
            .create_item(&CreateItemParams {
                list_id: item.list_id.clone(),
                name: name.to_string(),
                description,
                added_by: user_id.clone(),
                assigned_to: item.assigned_to.clone(),
            })
            .await
        {
            Ok(created) => created,
            Err(StoreError::NotFound) => return Err(CoreError::NotFound("list")),
            Err(e) => return Err(store_err("create_item")(e)),
        };

        self.publish(&created.list_id, ItemChangeEvent::created(&created))
            .await;
        self.record(
            ActivityEvent::builder(&created.list_id, user_id, ActivityType::ItemCreated)
                .target_item(&created.id)
                .details(serde_json::json!({ "name": created.name }))
                .build(),
        )
        .await;
        Ok(created)
    }

    /// Items of a list, oldest first. Members only.
    pub async fn list_items(
        &self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<Vec<ListItem>, CoreError> {
        self.require(user_id, list_id, None).await?;
        self.store
            .list_items(list_id)
            .await
            .map_err(store_err("list_items"))
    }

    /// Delete an item. Only the member who added it may.
    pub async fn delete_item(&self, item_id: &ItemId, user_id: &UserId) -> Result<(), CoreError> {
        let item = self.get_item(item_id).await?;
        self.require(user_id, &item.list_id, None).await?;
        if &item.added_by != user_id {
            return Err(CoreError::Unauthorized(DenyReason::NotItemOwner));
        }

        match self.store.delete_item(item_id).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(CoreError::NotFound("item")),
            Err(e) => return Err(store_err("delete_item")(e)),
        }

        self.publish(&item.list_id, ItemChangeEvent::deleted(&item))
            .await;
        self.record(
            ActivityEvent::builder(&item.list_id, user_id, ActivityType::ItemDeleted)
                .target_item(&item.id)
                .details(serde_json::json!({ "name": item.name }))
                .build(),
        )
        .await;
        Ok(())
    }

    /// Move an item to any status. `completed_at` is set on entering `done`
    /// and cleared on leaving it.
    pub async fn update_item_status(
        &self,
        item_id: &ItemId,
        user_id: &UserId,
        status: ItemStatus,
    ) -> Result<ListItem, CoreError> {
        let item = self.get_item(item_id).await?;
        self.require(user_id, &item.list_id, None).await?;

        let completed_at = match (status, item.completed_at) {
            (ItemStatus::Done, Some(at)) => Some(at),
            (ItemStatus::Done, None) => Some(Utc::now()),
            _ => None,
        };

        let updated = match self
            .store
            .update_item_status(&UpdateItemStatusParams {
                item_id: item_id.clone(),
                status,
                completed_at,
            })
            .await
        {
            Ok(updated) => updated,
            Err(StoreError::NotFound) => return Err(CoreError::NotFound("item")),
            Err(e) => return Err(store_err("update_item_status")(e)),
        };

        self.publish(&updated.list_id, ItemChangeEvent::updated(&updated))
            .await;
        let kind = if status == ItemStatus::Done {
            ActivityType::ItemCompleted
        } else {
            ActivityType::ItemUpdated
        };
        self.record(
            ActivityEvent::builder(&updated.list_id, user_id, kind)
                .target_item(&updated.id)
                .details(serde_json::json!({ "name": updated.name, "status": status.as_str() }))
                .build(),
        )
        .await;
        Ok(updated)
    }

    async fn get_item(&self, item_id: &ItemId) -> Result<ListItem, CoreError> {
        match self.store.get_item(item_id).await {
            Ok(item) => Ok(item),
            Err(StoreError::NotFound) => Err(CoreError::NotFound("item")),
            Err(e) => Err(store_err("get_item")(e)),
        }
    }
}
