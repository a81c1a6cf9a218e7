//! List handler tests.

use super::super::common::*;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_create_list() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;

    let (status, body) = app
        .post("/lists/create", &owner.token, json!({ "name": "  Groceries  " }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Groceries");
    assert_eq!(parse_uuid(&body["createdBy"]), owner.id.0);
    assert_eq!(body["inviteToken"].as_str().unwrap().len(), 10);
}

#[tokio::test]
async fn test_create_list_rejects_blank_name() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;

    for body in [json!({ "name": "   " }), json!({})] {
        let (status, resp) = app.post("/lists/create", &owner.token, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_get_lists_includes_roster() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    create_test_list(&app, &owner, "Hardware").await;
    join_test_list(&app, list_id, &owner, &member).await;

    let (status, body) = app.get("/lists/get-all", &owner.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = app.get("/lists/get-all", &member.token).await;
    assert_eq!(status, StatusCode::OK);
    let lists = body.as_array().unwrap();
    assert_eq!(lists.len(), 1);
    let groceries = &lists[0];
    assert_eq!(groceries["name"], "Groceries");
    // Members never see the owner's invite token.
    assert!(groceries.get("inviteToken").is_none());

    let members = groceries["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    let owner_entry = members
        .iter()
        .find(|m| parse_uuid(&m["id"]) == owner.id.0)
        .unwrap();
    assert_eq!(owner_entry["role"], "owner");
    assert_eq!(owner_entry["username"], "owner");
    let member_entry = members
        .iter()
        .find(|m| parse_uuid(&m["id"]) == member.id.0)
        .unwrap();
    assert_eq!(member_entry["role"], "member");
}

#[tokio::test]
async fn test_delete_list_creator_only() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &member).await;

    let (status, body) = app
        .delete("/lists/delete", &member.token, json!({ "listId": list_id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = app
        .delete("/lists/delete", &owner.token, json!({ "listId": list_id }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/lists/get-all", &member.token).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_list_bad_ids() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;

    let (status, body) = app
        .delete("/lists/delete", &owner.token, json!({ "listId": "nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = app
        .delete(
            "/lists/delete",
            &owner.token,
            json!({ "listId": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_leave_list() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &member).await;

    let (status, body) = app
        .post("/lists/leave", &owner.token, json!({ "listId": list_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = app
        .post("/lists/leave", &member.token, json!({ "listId": list_id }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // A second leave finds no membership.
    let (status, _) = app
        .post("/lists/leave", &member.token, json!({ "listId": list_id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .get(
            &format!("/list-items/get-all?listId={list_id}"),
            &member.token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_remove_member() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let alice = create_test_user(&app, "alice@example.com").await;
    let bob = create_test_user(&app, "bob@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &alice).await;
    join_test_list(&app, list_id, &owner, &bob).await;

    // Only the creator removes members.
    let (status, _) = app
        .post(
            "/lists/remove-member",
            &alice.token,
            json!({ "listId": list_id, "userId": bob.id.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The creator cannot remove themselves.
    let (status, _) = app
        .post(
            "/lists/remove-member",
            &owner.token,
            json!({ "listId": list_id, "userId": owner.id.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/lists/remove-member",
            &owner.token,
            json!({ "listId": list_id, "userId": bob.id.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/lists/get-all", &bob.token).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_member_requires_user_id() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;

    let (status, body) = app
        .post(
            "/lists/remove-member",
            &owner.token,
            json!({ "listId": list_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "userId is required");
}
