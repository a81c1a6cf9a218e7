//! Activity handler: list feed

use axum::extract::State;
use axum::Json;
use trolley_storage::ListId;

use crate::api::{required_id, ActivityDto, ListQuery};
use crate::error::ApiError;
use crate::extract::{AuthUser, QueryParams};
use crate::server::AppState;

pub async fn list_activity(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<ActivityDto>>, ApiError> {
    let list_id = ListId(required_id("listId", query.list_id.as_deref())?);

    let events = state
        .core
        .list_activity(&list_id, &user_id, query.limit)
        .await?;
    Ok(Json(events.into_iter().map(ActivityDto::from).collect()))
}
