//! List handlers: create, get-all, delete, leave, remove-member

use axum::extract::State;
use axum::Json;
use trolley_storage::{ListId, UserId};

use crate::api::{
    present, required_id, CreateListRequest, ListDto, ListRequest, ListWithMembersDto,
    MessageResponse, RemoveMemberRequest,
};
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody};
use crate::server::AppState;

pub async fn create_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<CreateListRequest>,
) -> Result<Json<ListDto>, ApiError> {
    let name = present(&req.name).ok_or_else(|| ApiError::validation("List name is required"))?;

    let created = state.core.create_list(name, &user_id).await?;
    Ok(Json(ListDto::for_viewer(created.list, &user_id)))
}

pub async fn get_lists(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ListWithMembersDto>>, ApiError> {
    let lists = state.core.lists_for_user(&user_id).await?;
    Ok(Json(
        lists
            .into_iter()
            .map(|entry| ListWithMembersDto::for_viewer(entry, &user_id))
            .collect(),
    ))
}

pub async fn delete_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<ListRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let list_id = ListId(required_id("listId", req.list_id.as_deref())?);

    state.core.delete_list(&list_id, &user_id).await?;
    Ok(Json(MessageResponse::ok("List deleted successfully")))
}

pub async fn leave_list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<ListRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let list_id = ListId(required_id("listId", req.list_id.as_deref())?);

    state.core.leave_list(&list_id, &user_id).await?;
    Ok(Json(MessageResponse::ok("Successfully left the list")))
}

pub async fn remove_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<RemoveMemberRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let list_id = ListId(required_id("listId", req.list_id.as_deref())?);
    let target = UserId(required_id("userId", req.user_id.as_deref())?);

    state.core.remove_member(&list_id, &target, &user_id).await?;
    Ok(Json(MessageResponse::ok("Member removed successfully")))
}
