//! List and membership types.

use chrono::{DateTime, Utc};

use super::{Invite, ListId, ListRole, MembershipId, UserId};

/// Shopping list record
#[derive(Clone, Debug)]
pub struct List {
    pub id: ListId,
    pub name: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    pub invite_token: Option<String>, // Mirrors the active invite row
}

/// Parameters for creating a list.
///
/// The store inserts the list, the creator's owner membership and the first
/// invite token in a single transaction.
#[derive(Clone, Debug)]
pub struct CreateListParams {
    pub name: String,
    pub created_by: UserId,
    pub invite_token: String,
    pub invite_expires_at: DateTime<Utc>,
}

/// Everything written by `create_list`.
#[derive(Clone, Debug)]
pub struct CreatedList {
    pub list: List,
    pub owner: Membership,
    pub invite: Invite,
}

/// List-user junction with role
#[derive(Clone, Debug)]
pub struct Membership {
    pub id: MembershipId,
    pub list_id: ListId,
    pub user_id: UserId,
    pub role: ListRole,
    pub joined_at: DateTime<Utc>,
}

/// Parameters for adding a user to a list
#[derive(Clone, Debug)]
pub struct AddMembershipParams {
    pub list_id: ListId,
    pub user_id: UserId,
    pub role: ListRole,
}
