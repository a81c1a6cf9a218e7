//! List lifecycle: create, delete, enumerate with roster, leave, remove member.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use trolley_activity::{ActivityEvent, ActivityType};
use trolley_storage::{
    CreateListParams, CreatedList, List, ListId, ListRole, StoreError, UserId,
};

use crate::error::store_err;
use crate::invites::generate_token;
use crate::{Core, CoreError, DenyReason};

pub const MAX_LIST_NAME_LEN: usize = 50;

/// One roster entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberInfo {
    pub user_id: UserId,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub role: ListRole,
}

#[derive(Clone, Debug)]
pub struct ListWithMembers {
    pub list: List,
    pub members: Vec<MemberInfo>,
}

fn validate_list_name(name: &str) -> Result<String, CoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::validation("List name is required"));
    }
    if name.chars().count() > MAX_LIST_NAME_LEN {
        return Err(CoreError::validation(format!(
            "List name must be at most {MAX_LIST_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

impl Core {
    /// Create a list owned by `owner_id`, with its first invite token.
    pub async fn create_list(
        &self,
        name: &str,
        owner_id: &UserId,
    ) -> Result<CreatedList, CoreError> {
        let name = validate_list_name(name)?;

        let mut retried = false;
        let created = loop {
            let params = CreateListParams {
                name: name.clone(),
                created_by: owner_id.clone(),
                invite_token: generate_token(),
                invite_expires_at: Utc::now() + self.config.invite_ttl,
            };
            match self.store.create_list(&params).await {
                Ok(created) => break created,
                Err(StoreError::AlreadyExists) if !retried => {
                    tracing::warn!("invite token collision on list creation, regenerating");
                    retried = true;
                }
                Err(StoreError::AlreadyExists) => {
                    tracing::error!("invite token collided twice on list creation");
                    return Err(CoreError::Internal("could not allocate invite token".into()));
                }
                Err(e) => return Err(store_err("create_list")(e)),
            }
        };

        tracing::info!(list_id = %created.list.id.0, owner = %owner_id.0, "list created");
        self.record(
            ActivityEvent::builder(&created.list.id, owner_id, ActivityType::ListCreated)
                .details(serde_json::json!({ "name": created.list.name }))
                .build(),
        )
        .await;
        Ok(created)
    }

    /// Delete a list. Only its creator may, whatever roles others hold.
    pub async fn delete_list(&self, list_id: &ListId, user_id: &UserId) -> Result<(), CoreError> {
        let list = self.get_list(list_id).await?;
        if &list.created_by != user_id {
            return Err(CoreError::Unauthorized(DenyReason::NotCreator));
        }

        match self.store.delete_list(list_id).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(CoreError::NotFound("list")),
            Err(e) => return Err(store_err("delete_list")(e)),
        }
        tracing::info!(list_id = %list_id.0, "list deleted");
        if let Err(e) = self.events.close(list_id).await {
            tracing::warn!(list_id = %list_id.0, error = %e, "failed to close list event streams");
        }
        Ok(())
    }

    /// Lists the user belongs to, each with its roster.
    pub async fn lists_for_user(&self, user_id: &UserId) -> Result<Vec<ListWithMembers>, CoreError> {
        let lists = self
            .store
            .list_lists_for_user(user_id)
            .await
            .map_err(store_err("list_lists_for_user"))?;
        if lists.is_empty() {
            return Ok(vec![]);
        }

        let list_ids: Vec<ListId> = lists.iter().map(|l| l.id.clone()).collect();
        let memberships = self
            .store
            .list_memberships(&list_ids)
            .await
            .map_err(store_err("list_memberships"))?;

        let mut seen = HashSet::new();
        let user_ids: Vec<UserId> = memberships
            .iter()
            .filter(|m| seen.insert(m.user_id.clone()))
            .map(|m| m.user_id.clone())
            .collect();
        let profiles: HashMap<UserId, _> = self
            .store
            .list_profiles(&user_ids)
            .await
            .map_err(store_err("list_profiles"))?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let mut rosters: HashMap<ListId, Vec<MemberInfo>> = HashMap::new();
        for m in memberships {
            let profile = profiles.get(&m.user_id);
            rosters.entry(m.list_id).or_default().push(MemberInfo {
                username: profile.and_then(|p| p.username.clone()),
                avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                user_id: m.user_id,
                role: m.role,
            });
        }

        Ok(lists
            .into_iter()
            .map(|list| ListWithMembers {
                members: rosters.remove(&list.id).unwrap_or_default(),
                list,
            })
            .collect())
    }

    /// Leave a list. The creator cannot leave their own list.
    pub async fn leave_list(&self, list_id: &ListId, user_id: &UserId) -> Result<(), CoreError> {
        let membership = match self.store.get_membership(list_id, user_id).await {
            Ok(m) => m,
            Err(StoreError::NotFound) => {
                return Err(CoreError::validation("You are not a member of this list"))
            }
            Err(e) => return Err(store_err("get_membership")(e)),
        };
        let list = self.get_list(list_id).await?;
        if membership.role == ListRole::Owner || &list.created_by == user_id {
            return Err(CoreError::validation("The list owner cannot leave the list"));
        }

        self.remove(list_id, user_id).await?;
        tracing::info!(list_id = %list_id.0, user_id = %user_id.0, "member left list");
        self.record(ActivityEvent::builder(list_id, user_id, ActivityType::MemberLeft).build())
            .await;
        Ok(())
    }

    /// Remove `target` from a list. Only the creator may, and not themselves.
    pub async fn remove_member(
        &self,
        list_id: &ListId,
        target: &UserId,
        requester: &UserId,
    ) -> Result<(), CoreError> {
        let list = self.get_list(list_id).await?;
        if &list.created_by != requester {
            return Err(CoreError::Unauthorized(DenyReason::NotCreator));
        }
        match self.store.get_membership(list_id, target).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                return Err(CoreError::validation("User is not a member of this list"))
            }
            Err(e) => return Err(store_err("get_membership")(e)),
        }
        if target == requester {
            return Err(CoreError::validation(
                "The list owner cannot remove themselves",
            ));
        }

        self.remove(list_id, target).await?;
        tracing::info!(list_id = %list_id.0, user_id = %target.0, "member removed");
        self.record(
            ActivityEvent::builder(list_id, requester, ActivityType::MemberRemoved)
                .target_user(target)
                .build(),
        )
        .await;
        Ok(())
    }

    async fn get_list(&self, list_id: &ListId) -> Result<List, CoreError> {
        match self.store.get_list(list_id).await {
            Ok(list) => Ok(list),
            Err(StoreError::NotFound) => Err(CoreError::NotFound("list")),
            Err(e) => Err(store_err("get_list")(e)),
        }
    }

    async fn remove(&self, list_id: &ListId, user_id: &UserId) -> Result<(), CoreError> {
        match self.store.remove_membership(list_id, user_id).await {
            // Already gone: someone else removed them first.
            Ok(()) | Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(store_err("remove_membership")(e)),
        }
    }
}
