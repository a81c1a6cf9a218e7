//! JSON request and response bodies.
//!
//! Request fields are optional so that a missing field surfaces as a
//! structured 400 from the handler rather than a deserializer rejection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trolley_activity::{ActivityEvent, ActivityType};
use trolley_core::{ListWithMembers, MemberInfo};
use trolley_storage::{Invite, List, UserId};
use uuid::Uuid;

use crate::error::ApiError;

/// Parse a required UUID field.
pub fn required_id(field: &str, value: Option<&str>) -> Result<Uuid, ApiError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(format!("{field} is required")))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("Invalid {field}")))
}

/// Non-empty after trimming, or `None`.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// ───────────────────────────── Auth ─────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

// ───────────────────────────── Lists ─────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateListRequest {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListRequest {
    pub list_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoveMemberRequest {
    pub list_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDto {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
    /// Only shown to the list's creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_token: Option<String>,
}

impl ListDto {
    pub fn for_viewer(list: List, viewer: &UserId) -> Self {
        let invite_token = if &list.created_by == viewer {
            list.invite_token
        } else {
            None
        };
        Self {
            id: list.id.0,
            name: list.name,
            created_by: list.created_by.0,
            created_at: list.created_at,
            updated_at: list.updated_at,
            archived_at: list.archived_at,
            invite_token,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDto {
    pub id: Uuid,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub role: &'static str,
}

impl From<MemberInfo> for MemberDto {
    fn from(m: MemberInfo) -> Self {
        Self {
            id: m.user_id.0,
            username: m.username,
            avatar_url: m.avatar_url,
            role: m.role.as_str(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWithMembersDto {
    #[serde(flatten)]
    pub list: ListDto,
    pub members: Vec<MemberDto>,
}

impl ListWithMembersDto {
    pub fn for_viewer(entry: ListWithMembers, viewer: &UserId) -> Self {
        Self {
            list: ListDto::for_viewer(entry.list, viewer),
            members: entry.members.into_iter().map(MemberDto::from).collect(),
        }
    }
}

// ───────────────────────────── Invites ─────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InviteRequest {
    pub list_id: Option<String>,
    pub refresh: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinRequest {
    pub invite_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteResponse {
    pub invite_token: String,
    pub invite_link: String,
    pub expires_at: DateTime<Utc>,
    pub refreshed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteHistoryEntry {
    pub invite_token: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub invalidated_at: Option<DateTime<Utc>>,
}

impl From<Invite> for InviteHistoryEntry {
    fn from(i: Invite) -> Self {
        Self {
            invite_token: i.token,
            created_by: i.created_by.0,
            created_at: i.created_at,
            expires_at: i.expires_at,
            invalidated_at: i.invalidated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    pub message: String,
    pub list_id: Uuid,
}

// ───────────────────────────── Items ─────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddItemRequest {
    pub list_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemRequest {
    pub item_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub item_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListQuery {
    pub list_id: Option<String>,
    pub limit: Option<u32>,
}

// ───────────────────────────── Activity ─────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDto {
    pub id: Uuid,
    pub list_id: Uuid,
    pub user_id: Uuid,
    pub activity_type: ActivityType,
    pub target_item_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<ActivityEvent> for ActivityDto {
    fn from(e: ActivityEvent) -> Self {
        Self {
            id: e.id.0,
            list_id: e.list_id,
            user_id: e.user_id,
            activity_type: e.activity_type,
            target_item_id: e.target_item_id,
            target_user_id: e.target_user_id,
            details: e.details,
            created_at: e.created_at,
        }
    }
}
