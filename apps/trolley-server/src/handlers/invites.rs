//! Invite handlers: issue, refresh, history, join

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use trolley_core::Issued;
use trolley_storage::{Invite, ListId};

use crate::api::{
    present, required_id, InviteHistoryEntry, InviteRequest, InviteResponse, JoinRequest,
    JoinResponse, ListQuery, ListRequest,
};
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody, QueryParams};
use crate::server::AppState;

fn invite_response(state: &AppState, invite: &Invite, refreshed: bool) -> InviteResponse {
    InviteResponse {
        invite_token: invite.token.clone(),
        invite_link: state.core.invite_link(&invite.token),
        expires_at: invite.expires_at,
        refreshed,
    }
}

/// 200 with the active token, or 201 when a new one was minted.
pub async fn issue_invite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<InviteRequest>,
) -> Result<(StatusCode, Json<InviteResponse>), ApiError> {
    let list_id = ListId(required_id("listId", req.list_id.as_deref())?);

    let issued = state
        .core
        .issue_invite(&list_id, &user_id, req.refresh)
        .await?;
    let status = match &issued {
        Issued::Existing(_) => StatusCode::OK,
        Issued::Rotated(_) => StatusCode::CREATED,
    };
    Ok((
        status,
        Json(invite_response(&state, issued.invite(), req.refresh)),
    ))
}

pub async fn refresh_invite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<ListRequest>,
) -> Result<Json<InviteResponse>, ApiError> {
    let list_id = ListId(required_id("listId", req.list_id.as_deref())?);

    let invite = state.core.rotate_invite(&list_id, &user_id).await?;
    Ok(Json(invite_response(&state, &invite, true)))
}

pub async fn invite_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<InviteHistoryEntry>>, ApiError> {
    let list_id = ListId(required_id("listId", query.list_id.as_deref())?);

    let invites = state.core.invite_history(&list_id, &user_id).await?;
    Ok(Json(invites.into_iter().map(Into::into).collect()))
}

pub async fn join_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let token = present(&req.invite_token)
        .ok_or_else(|| ApiError::validation("Invite token is required"))?;

    let membership = state.core.redeem_invite(token, &user_id).await?;
    Ok(Json(JoinResponse {
        success: true,
        message: "Successfully joined the list".to_string(),
        list_id: membership.list_id.0,
    }))
}
