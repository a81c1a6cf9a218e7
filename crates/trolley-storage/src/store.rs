//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait `trolley-core` depends on.
///
/// Multi-row writes (`create_list`, `rotate_invite`) are atomic: a backend
/// must either persist every row or none of them.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Profiles ───────────────────────────────────────

    /// Create the profile projection for a freshly signed-up user.
    async fn create_profile(&self, params: &CreateProfileParams) -> Result<Profile, StoreError>;

    /// Get profile by user ID.
    async fn get_profile(&self, user_id: &UserId) -> Result<Profile, StoreError>;

    /// Fetch profiles for a batch of users. Unknown IDs are skipped.
    async fn list_profiles(&self, user_ids: &[UserId]) -> Result<Vec<Profile>, StoreError>;

    // ───────────────────────────────────── Lists ──────────────────────────────────────────

    /// Create a list together with its owner membership and first invite.
    ///
    /// Returns `AlreadyExists` if the invite token collides with an existing one.
    async fn create_list(&self, params: &CreateListParams) -> Result<CreatedList, StoreError>;

    /// Get list by ID.
    async fn get_list(&self, list_id: &ListId) -> Result<List, StoreError>;

    /// All lists the user holds a membership on, oldest first.
    async fn list_lists_for_user(&self, user_id: &UserId) -> Result<Vec<List>, StoreError>;

    /// Delete a list. Memberships, invites and items cascade.
    async fn delete_list(&self, list_id: &ListId) -> Result<(), StoreError>;

    // ───────────────────────────────────── Memberships ────────────────────────────────────

    /// Get the membership of a user on a list.
    async fn get_membership(
        &self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<Membership, StoreError>;

    /// Add a user to a list. `AlreadyExists` if the user is already a member.
    async fn add_membership(&self, params: &AddMembershipParams) -> Result<Membership, StoreError>;

    /// Remove a user from a list.
    async fn remove_membership(&self, list_id: &ListId, user_id: &UserId)
        -> Result<(), StoreError>;

    /// All memberships of the given lists, ordered by join time.
    async fn list_memberships(&self, list_ids: &[ListId]) -> Result<Vec<Membership>, StoreError>;

    // ───────────────────────────────────── Invites ────────────────────────────────────────

    /// The list's invite with `invalidated_at` unset, expired or not.
    async fn get_active_invite(&self, list_id: &ListId) -> Result<Invite, StoreError>;

    /// Get invite by token (including invalidated ones).
    async fn get_invite_by_token(&self, token: &str) -> Result<Invite, StoreError>;

    /// Invalidate the current active invite, insert a new one and repoint the list.
    ///
    /// `AlreadyExists` on a token collision, `Conflict` if another rotation won.
    async fn rotate_invite(&self, params: &CreateInviteParams) -> Result<Invite, StoreError>;

    /// Every invite ever issued for a list, oldest first.
    async fn list_invites(&self, list_id: &ListId) -> Result<Vec<Invite>, StoreError>;

    // ───────────────────────────────────── Items ──────────────────────────────────────────

    /// Insert a new item with status `open`.
    async fn create_item(&self, params: &CreateItemParams) -> Result<ListItem, StoreError>;

    /// Get item by ID.
    async fn get_item(&self, item_id: &ItemId) -> Result<ListItem, StoreError>;

    /// Items of a list ordered by `created_at`, then `seq`.
    async fn list_items(&self, list_id: &ListId) -> Result<Vec<ListItem>, StoreError>;

    /// Delete an item.
    async fn delete_item(&self, item_id: &ItemId) -> Result<(), StoreError>;

    /// Set status and completion time, bumping `updated_at`.
    async fn update_item_status(
        &self,
        params: &UpdateItemStatusParams,
    ) -> Result<ListItem, StoreError>;
}
