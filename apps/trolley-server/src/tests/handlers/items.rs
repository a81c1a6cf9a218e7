//! Item handler tests.

use super::super::common::*;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_add_item() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &member).await;

    let (status, body) = app
        .post(
            "/list-items/add",
            &owner.token,
            json!({
                "listId": list_id,
                "name": " Milk ",
                "description": "  2 litres ",
                "assignedTo": member.id.0,
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Milk");
    assert_eq!(body["description"], "2 litres");
    assert_eq!(body["status"], "open");
    assert!(body["completedAt"].is_null());
    assert_eq!(parse_uuid(&body["addedBy"]), owner.id.0);
    assert_eq!(parse_uuid(&body["assignedTo"]), member.id.0);
}

#[tokio::test]
async fn test_add_item_validation() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let outsider = create_test_user(&app, "outsider@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;

    let (status, body) = app
        .post(
            "/list-items/add",
            &owner.token,
            json!({ "listId": list_id, "name": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Item name is required");

    let (status, body) = app
        .post("/list-items/add", &owner.token, json!({ "name": "Milk" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "listId is required");

    // Assignees must belong to the list.
    let (status, body) = app
        .post(
            "/list-items/add",
            &owner.token,
            json!({ "listId": list_id, "name": "Milk", "assignedTo": outsider.id.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_add_item_requires_membership() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let outsider = create_test_user(&app, "outsider@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;

    let (status, body) = app
        .post(
            "/list-items/add",
            &outsider.token,
            json!({ "listId": list_id, "name": "Milk" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied: not-a-member");
}

#[tokio::test]
async fn test_get_items_in_insertion_order() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    for name in ["Milk", "Eggs", "Bread"] {
        add_test_item(&app, list_id, &owner, name).await;
    }

    let (status, body) = app
        .get(
            &format!("/list-items/get-all?listId={list_id}"),
            &owner.token,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Milk", "Eggs", "Bread"]);
}

#[tokio::test]
async fn test_get_items_missing_list_id() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;

    let (status, body) = app.get("/list-items/get-all", &owner.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_delete_item_only_by_adder() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &member).await;
    let item_id = add_test_item(&app, list_id, &member, "Milk").await;

    // Not even the list owner may delete someone else's item.
    let (status, body) = app
        .delete(
            "/list-items/delete",
            &owner.token,
            json!({ "itemId": item_id }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied: not-item-owner");

    let (status, _) = app
        .delete(
            "/list-items/delete",
            &member.token,
            json!({ "itemId": item_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .delete(
            "/list-items/delete",
            &member.token,
            json!({ "itemId": item_id }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Item not found");
}

#[tokio::test]
async fn test_update_status_tracks_completion() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &member).await;
    let item_id = add_test_item(&app, list_id, &owner, "Milk").await;

    let (status, body) = app
        .patch(
            "/list-items/update-status",
            &member.token,
            json!({ "itemId": item_id, "status": "done" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "done");
    let completed_at = body["completedAt"].clone();
    assert!(completed_at.is_string());

    // Staying done keeps the original completion time.
    let (_, body) = app
        .patch(
            "/list-items/update-status",
            &member.token,
            json!({ "itemId": item_id, "status": "done" }),
        )
        .await;
    assert_eq!(body["completedAt"], completed_at);

    let (_, body) = app
        .patch(
            "/list-items/update-status",
            &owner.token,
            json!({ "itemId": item_id, "status": "pending" }),
        )
        .await;
    assert_eq!(body["status"], "pending");
    assert!(body["completedAt"].is_null());
}

#[tokio::test]
async fn test_update_status_validation() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let outsider = create_test_user(&app, "outsider@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    let item_id = add_test_item(&app, list_id, &owner, "Milk").await;

    let (status, body) = app
        .patch(
            "/list-items/update-status",
            &owner.token,
            json!({ "itemId": item_id, "status": "bought" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Status must be one of open, pending, done");

    let (status, _) = app
        .patch(
            "/list-items/update-status",
            &outsider.token,
            json!({ "itemId": item_id, "status": "done" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .patch(
            "/list-items/update-status",
            &owner.token,
            json!({ "itemId": uuid::Uuid::new_v4(), "status": "done" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
