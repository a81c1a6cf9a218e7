//! Item handlers: add, get-all, delete, update-status

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use trolley_core::NewItem;
use trolley_events::ItemSnapshot;
use trolley_storage::{ItemId, ItemStatus, ListId, UserId};

use crate::api::{
    present, required_id, AddItemRequest, ItemRequest, ListQuery, MessageResponse,
    UpdateStatusRequest,
};
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody, QueryParams};
use crate::server::AppState;

#[derive(Serialize)]
pub struct ItemsResponse {
    pub items: Vec<ItemSnapshot>,
}

pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<AddItemRequest>,
) -> Result<(StatusCode, Json<ItemSnapshot>), ApiError> {
    let list_id = ListId(required_id("listId", req.list_id.as_deref())?);
    let name = present(&req.name).ok_or_else(|| ApiError::validation("Item name is required"))?;
    let assigned_to = match present(&req.assigned_to) {
        Some(raw) => Some(UserId(required_id("assignedTo", Some(raw))?)),
        None => None,
    };

    let item = state
        .core
        .add_item(
            NewItem {
                list_id,
                name: name.to_string(),
                description: req.description.clone(),
                assigned_to,
            },
            &user_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ItemSnapshot::from(&item))))
}

pub async fn get_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<ItemsResponse>, ApiError> {
    let list_id = ListId(required_id("listId", query.list_id.as_deref())?);

    let items = state.core.list_items(&list_id, &user_id).await?;
    Ok(Json(ItemsResponse {
        items: items.iter().map(ItemSnapshot::from).collect(),
    }))
}

pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<ItemRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let item_id = ItemId(required_id("itemId", req.item_id.as_deref())?);

    state.core.delete_item(&item_id, &user_id).await?;
    Ok(Json(MessageResponse::ok("Item successfully deleted")))
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> Result<Json<ItemSnapshot>, ApiError> {
    let item_id = ItemId(required_id("itemId", req.item_id.as_deref())?);
    let status: ItemStatus = present(&req.status)
        .ok_or_else(|| ApiError::validation("Status is required"))?
        .parse()
        .map_err(|_| ApiError::validation("Status must be one of open, pending, done"))?;

    let item = state
        .core
        .update_item_status(&item_id, &user_id, status)
        .await?;
    Ok(Json(ItemSnapshot::from(&item)))
}
