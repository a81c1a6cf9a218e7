//! Invite handler tests.

use super::super::common::*;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use trolley_storage::{CreateInviteParams, ListId, Store};

#[tokio::test]
async fn test_issue_invite_returns_active_token() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let (_, created) = app
        .post("/lists/create", &owner.token, json!({ "name": "Groceries" }))
        .await;
    let list_id = parse_uuid(&created["id"]);

    let (status, body) = app
        .post("/lists/invite", &owner.token, json!({ "listId": list_id }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inviteToken"], created["inviteToken"]);
    assert_eq!(body["refreshed"], false);
    assert_eq!(
        body["inviteLink"],
        format!(
            "https://trolley.test/list-invite/{}",
            created["inviteToken"].as_str().unwrap()
        )
    );
}

#[tokio::test]
async fn test_issue_invite_refresh_mints_new_token() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let (_, created) = app
        .post("/lists/create", &owner.token, json!({ "name": "Groceries" }))
        .await;
    let list_id = parse_uuid(&created["id"]);

    let (status, body) = app
        .post(
            "/lists/invite",
            &owner.token,
            json!({ "listId": list_id, "refresh": true }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["refreshed"], true);
    assert_ne!(body["inviteToken"], created["inviteToken"]);

    // The old token no longer admits anyone.
    let guest = create_test_user(&app, "guest@example.com").await;
    let (status, resp) = app
        .post(
            "/lists/join",
            &guest.token,
            json!({ "inviteToken": created["inviteToken"] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["message"], "Invalid or expired invite token");
}

#[tokio::test]
async fn test_issue_invite_owner_only() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let stranger = create_test_user(&app, "stranger@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &member).await;

    for user in [&member, &stranger] {
        let (status, body) = app
            .post("/lists/invite", &user.token, json!({ "listId": list_id }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn test_issue_invite_replaces_expired_token() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;

    app.store
        .rotate_invite(&CreateInviteParams {
            list_id: ListId(list_id),
            token: "EXPIRED000".to_string(),
            created_by: owner.id.clone(),
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();

    let (status, body) = app
        .post("/lists/invite", &owner.token, json!({ "listId": list_id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(body["inviteToken"], "EXPIRED000");
}

#[tokio::test]
async fn test_refresh_invite_token() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;

    let (status, first) = app
        .post(
            "/lists/refresh-invite-token",
            &owner.token,
            json!({ "listId": list_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app
        .post(
            "/lists/refresh-invite-token",
            &owner.token,
            json!({ "listId": list_id }),
        )
        .await;
    assert_ne!(first["inviteToken"], second["inviteToken"]);

    let (status, history) = app
        .get(&format!("/lists/invites?listId={list_id}"), &owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 3);
    let active: Vec<_> = history
        .iter()
        .filter(|i| i["invalidatedAt"].is_null())
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["inviteToken"], second["inviteToken"]);
}

#[tokio::test]
async fn test_invite_history_owner_only() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let member = create_test_user(&app, "member@example.com").await;
    let list_id = create_test_list(&app, &owner, "Groceries").await;
    join_test_list(&app, list_id, &owner, &member).await;

    let (status, _) = app
        .get(&format!("/lists/invites?listId={list_id}"), &member.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_join_list() {
    let app = create_test_app().await;
    let owner = create_test_user(&app, "owner@example.com").await;
    let guest = create_test_user(&app, "guest@example.com").await;
    let (_, created) = app
        .post("/lists/create", &owner.token, json!({ "name": "Groceries" }))
        .await;

    let (status, body) = app
        .post(
            "/lists/join",
            &guest.token,
            json!({ "inviteToken": created["inviteToken"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["listId"], created["id"]);

    let (status, body) = app
        .post(
            "/lists/join",
            &guest.token,
            json!({ "inviteToken": created["inviteToken"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You are already a member of this list");
}

#[tokio::test]
async fn test_join_list_bad_tokens() {
    let app = create_test_app().await;
    let guest = create_test_user(&app, "guest@example.com").await;

    let (status, body) = app.post("/lists/join", &guest.token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    for token in ["short", "AAAAAAAAAA", "has spaces!"] {
        let (status, body) = app
            .post("/lists/join", &guest.token, json!({ "inviteToken": token }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "token {token}");
        assert_eq!(body["error"], "NOT_FOUND");
    }
}
