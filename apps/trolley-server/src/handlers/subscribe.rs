//! Server-sent item change events for one list.

use std::convert::Infallible;
use std::future::ready;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use trolley_core::{Core, CoreError};
use trolley_events::{EventType, ItemChangeEvent};
use trolley_storage::{ListId, UserId};

use crate::api::{required_id, ListQuery};
use crate::error::ApiError;
use crate::extract::{AuthUser, QueryParams};
use crate::server::AppState;

fn to_sse(event: ItemChangeEvent) -> Option<Event> {
    let name = match event.event_type {
        EventType::Created => "created",
        EventType::Updated => "updated",
        EventType::Deleted => "deleted",
    };
    match Event::default()
        .event(name)
        .id(event.item_id.to_string())
        .json_data(&event)
    {
        Ok(e) => Some(e),
        Err(e) => {
            tracing::warn!(item_id = %event.item_id, error = %e, "failed to encode item event");
            None
        }
    }
}

/// Whether the subscriber may still see events for the list.
async fn still_member(core: &Core, user_id: &UserId, list_id: &ListId) -> bool {
    match core.require(user_id, list_id, None).await {
        Ok(_) => true,
        Err(CoreError::Unauthorized(_)) | Err(CoreError::NotFound(_)) => {
            tracing::debug!(list_id = %list_id.0, user_id = %user_id.0, "item stream closed, access revoked");
            false
        }
        Err(e) => {
            tracing::warn!(list_id = %list_id.0, user_id = %user_id.0, error = %e, "membership check failed, closing item stream");
            false
        }
    }
}

/// Members only. The stream carries changes made after subscription;
/// clients fetch the list first and merge events on top. Membership is
/// checked again before each event, and the stream ends once the user is
/// no longer a member or the list is gone.
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let list_id = ListId(required_id("listId", query.list_id.as_deref())?);
    state.core.require(&user_id, &list_id, None).await?;

    let events = state
        .core
        .events()
        .subscribe(&list_id)
        .await
        .map_err(|e| ApiError::internal("failed to subscribe to list events", e))?;
    tracing::debug!(list_id = %list_id.0, user_id = %user_id.0, "item stream opened");

    let core: Arc<Core> = state.core.clone();
    let stream = events
        .then(move |event| {
            let core = core.clone();
            let user_id = user_id.clone();
            let list_id = list_id.clone();
            async move {
                let allowed = still_member(&core, &user_id, &list_id).await;
                (allowed, event)
            }
        })
        .take_while(|(allowed, _)| ready(*allowed))
        .filter_map(|(_, event)| async move { to_sse(event).map(Ok) });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
