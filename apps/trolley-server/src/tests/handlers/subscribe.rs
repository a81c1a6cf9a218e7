//! Item stream (SSE) handler tests.

use std::time::Duration;

use super::super::common::*;
use axum::body::Body;
use axum::http::{header, Method, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;
use trolley_core::NewItem;
use trolley_storage::ListId;

/// Read body frames until one SSE event has been received.
async fn next_event(body: &mut Body) -> String {
    let mut buf = String::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended")
            .unwrap();
        if let Ok(data) = frame.into_data() {
            buf.push_str(std::str::from_utf8(&data).unwrap());
        }
        if buf.contains("\n\n") {
            return buf;
        }
    }
}

/// Drain the body until it ends, returning everything it carried.
async fn until_closed(body: &mut Body) -> String {
    let mut buf = String::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("stream stayed open");
        match frame {
            None => return buf,
            Some(frame) => {
                if let Ok(data) = frame.unwrap().into_data() {
                    buf.push_str(std::str::from_utf8(&data).unwrap());
                }
            }
        }
    }
}

async fn open_stream(app: &TestApp, list_id: uuid::Uuid, token: &str) -> Body {
    let response = app
        .router
        .clone()
        .oneshot(build_request(
            Method::GET,
            &format!("/list-items/subscribe?listId={list_id}"),
            Some(token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.into_body()
}

fn data_line(event: &str) -> serde_json::Value {
    let data = event
        .lines()
        .find_map(|l| l.strip_prefix("data: "))
        .unwrap();
    serde_json::from_str(data).unwrap()
}

#[tokio::test]
async fn test_subscribe_streams_item_changes() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;

    let response = app
        .router
        .clone()
        .oneshot(build_request(
            Method::GET,
            &format!("/list-items/subscribe?listId={list_id}"),
            Some(&owner.token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let mut body = response.into_body();

    let item = app
        .core
        .add_item(
            NewItem {
                list_id: ListId(list_id),
                name: "Milk".to_string(),
                description: None,
                assigned_to: None,
            },
            &owner.id,
        )
        .await
        .unwrap();

    let event = next_event(&mut body).await;
    assert!(event.contains("event: created"), "{event}");
    assert!(event.contains(&format!("id: {}", item.id.0)), "{event}");
    let payload = data_line(&event);
    assert_eq!(payload["eventType"], "created");
    assert_eq!(payload["item"]["name"], "Milk");

    app.patch(
        "/list-items/update-status",
        &owner.token,
        json!({ "itemId": item.id.0, "status": "done" }),
    )
    .await;
    let event = next_event(&mut body).await;
    assert!(event.contains("event: updated"), "{event}");
    assert_eq!(data_line(&event)["item"]["status"], "done");

    app.delete(
        "/list-items/delete",
        &owner.token,
        json!({ "itemId": item.id.0 }),
    )
    .await;
    let event = next_event(&mut body).await;
    assert!(event.contains("event: deleted"), "{event}");
}

#[tokio::test]
async fn test_subscribe_members_only() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let outsider = create_test_user(&app, "outsider@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;

    let (status, body) = app
        .get(
            &format!("/list-items/subscribe?listId={list_id}"),
            &outsider.token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_subscribe_ends_when_member_is_removed() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let guest = create_test_user(&app, "guest@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &guest).await;

    let mut guest_body = open_stream(&app, list_id, &guest.token).await;
    let mut owner_body = open_stream(&app, list_id, &owner.token).await;

    let (status, _) = app
        .post(
            "/lists/remove-member",
            &owner.token,
            json!({ "listId": list_id, "userId": guest.id.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    add_test_item(&app, list_id, &owner, "Secret gift").await;

    let leftover = until_closed(&mut guest_body).await;
    assert!(!leftover.contains("Secret gift"), "{leftover}");

    // Remaining members keep their stream.
    let event = next_event(&mut owner_body).await;
    assert_eq!(data_line(&event)["item"]["name"], "Secret gift");
}

#[tokio::test]
async fn test_subscribe_ends_when_member_leaves() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let guest = create_test_user(&app, "guest@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &guest).await;

    let mut guest_body = open_stream(&app, list_id, &guest.token).await;
    let (status, _) = app
        .post("/lists/leave", &guest.token, json!({ "listId": list_id }))
        .await;
    assert_eq!(status, StatusCode::OK);

    add_test_item(&app, list_id, &owner, "Cake").await;
    let leftover = until_closed(&mut guest_body).await;
    assert!(!leftover.contains("Cake"), "{leftover}");
}

#[tokio::test]
async fn test_subscribe_ends_when_list_is_deleted() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &member).await;

    let mut member_body = open_stream(&app, list_id, &member.token).await;
    let (status, _) = app
        .delete("/lists/delete", &owner.token, json!({ "listId": list_id }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // No further events are published, yet the stream must not hang.
    let leftover = until_closed(&mut member_body).await;
    assert!(!leftover.contains("event:"), "{leftover}");
}
