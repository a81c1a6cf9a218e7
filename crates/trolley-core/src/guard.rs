//! The single authorization gate for list-scoped operations.

use trolley_storage::{ListId, ListRole, Membership, Store, StoreError, UserId};

use crate::error::store_err;
use crate::{Core, CoreError, DenyReason};

#[derive(Clone, Debug)]
pub enum Access {
    Allow(Membership),
    Deny(DenyReason),
}

/// Decide whether `user_id` may act on `list_id`.
///
/// `required` of `None` accepts any role; otherwise the member's role must
/// include it (owner includes member includes read-only). Read-only.
pub async fn authorize(
    store: &dyn Store,
    user_id: &UserId,
    list_id: &ListId,
    required: Option<ListRole>,
) -> Result<Access, CoreError> {
    let membership = match store.get_membership(list_id, user_id).await {
        Ok(m) => m,
        Err(StoreError::NotFound) => return Ok(Access::Deny(DenyReason::NotAMember)),
        Err(e) => return Err(store_err("get_membership")(e)),
    };

    match required {
        Some(role) if !membership.role.includes(&role) => Ok(Access::Deny(match role {
            ListRole::Owner => DenyReason::NotOwner,
            _ => DenyReason::InsufficientRole,
        })),
        _ => Ok(Access::Allow(membership)),
    }
}

impl Core {
    /// `authorize`, with a denial surfaced as `Unauthorized`.
    pub async fn require(
        &self,
        user_id: &UserId,
        list_id: &ListId,
        required: Option<ListRole>,
    ) -> Result<Membership, CoreError> {
        match authorize(self.store.as_ref(), user_id, list_id, required).await? {
            Access::Allow(m) => Ok(m),
            Access::Deny(reason) => {
                tracing::debug!(user_id = %user_id.0, list_id = %list_id.0, %reason, "access denied");
                Err(CoreError::Unauthorized(reason))
            }
        }
    }
}
