//! Auth handler tests.

use std::sync::Arc;

use super::super::common::*;
use axum::http::{Method, StatusCode};
use serde_json::json;
use trolley_core::{Core, CoreConfig};
use trolley_events_memory::MemoryEventBus;
use trolley_identity::{
    IdentityError, IdentityProvider, KdfCost, MockIdentityProvider, PasswordIdentityProvider,
};
use trolley_storage::{CreateProfileParams, MockStore, Store, StoreError, UserId};
use trolley_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::server::{api_router, AppState};

#[tokio::test]
async fn test_sign_up_creates_profile() {
    let app = create_test_app().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/sign-up",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let user_id = UserId(parse_uuid(&body["userId"]));
    let profile = app.store.get_profile(&user_id).await.unwrap();
    assert_eq!(profile.email, "ada@example.com");
    assert_eq!(profile.username.as_deref(), Some("ada"));
}

#[tokio::test]
async fn test_sign_up_requires_both_fields() {
    let app = create_test_app().await;

    for body in [
        json!({ "email": "ada@example.com" }),
        json!({ "password": "hunter22" }),
        json!({ "email": "   ", "password": "hunter22" }),
        json!({}),
    ] {
        let (status, resp) = app
            .call(Method::POST, "/auth/sign-up", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["error"], "MISSING_FIELDS");
        assert_eq!(resp["success"], false);
    }
}

#[tokio::test]
async fn test_sign_up_duplicate_email() {
    let app = create_test_app().await;
    create_test_user(&app, "dup@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/sign-up",
            None,
            Some(json!({ "email": "DUP@example.com", "password": "other" })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "EMAIL_EXISTS");
}

#[tokio::test]
async fn test_sign_up_with_orphaned_profile_is_conflict() {
    let app = create_test_app().await;
    // A profile row already holds the address, but the identity provider
    // has never seen it.
    app.store
        .create_profile(&CreateProfileParams {
            id: UserId(Uuid::new_v4()),
            email: "orphan@example.com".to_string(),
            username: None,
        })
        .await
        .unwrap();

    let credentials = json!({ "email": "orphan@example.com", "password": "hunter22" });
    let (status, body) = app
        .call(
            Method::POST,
            "/auth/sign-up",
            None,
            Some(credentials.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "EMAIL_EXISTS");

    // The half-created account must not be usable.
    let (status, body) = app
        .call(Method::POST, "/auth/sign-in", None, Some(credentials))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_sign_up_removes_user_when_profile_fails() {
    let sqlite = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let mut store = MockStore::new();
    store
        .expect_create_profile()
        .returning(|_| Err(StoreError::Backend("disk I/O error".into())));
    let core = Arc::new(Core::new(
        Arc::new(store),
        Arc::new(MemoryEventBus::new()),
        sqlite.clone(),
        CoreConfig::default(),
    ));
    let identity = Arc::new(PasswordIdentityProvider::new(
        sqlite.clone(),
        KdfCost::testing(),
    ));
    let router = api_router(AppState::new(core.clone(), identity.clone()));
    let app = TestApp {
        router,
        core,
        store: sqlite,
        identity: identity.clone(),
    };

    let credentials = json!({ "email": "ada@example.com", "password": "hunter22" });
    let (status, body) = app
        .call(Method::POST, "/auth/sign-up", None, Some(credentials.clone()))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "PROFILE_CREATION_ERROR");
    assert!(!body["message"].as_str().unwrap().contains("disk"));

    let err = identity.sign_in("ada@example.com", "hunter22").await.unwrap_err();
    assert!(matches!(err, IdentityError::InvalidCredentials));
}

#[tokio::test]
async fn test_accounts_survive_restart() {
    let path = std::env::temp_dir().join(format!("trolley-restart-{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());

    let app = create_test_app_over(Arc::new(SqliteStore::open(&url).await.unwrap()));
    let user = create_test_user(&app, "ada@example.com").await;
    let list_id = create_test_list(&app, &user, "Groceries").await;
    drop(app);

    let app = create_test_app_over(Arc::new(SqliteStore::open(&url).await.unwrap()));

    // The session issued before the restart still works.
    let (status, lists) = app.get("/lists/get-all", &user.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_uuid(&lists[0]["id"]), list_id);

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/sign-in",
            None,
            Some(json!({ "email": "ada@example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_uuid(&body["userId"]), user.id.0);

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/sign-up",
            None,
            Some(json!({ "email": "ada@example.com", "password": "another" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "EMAIL_EXISTS");

    drop(app);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_sign_in_wrong_password() {
    let app = create_test_app().await;
    create_test_user(&app, "ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/sign-in",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_sign_in_token_authenticates() {
    let app = create_test_app().await;
    let user = create_test_user(&app, "ada@example.com").await;

    let resolved = app.identity.authenticate(&user.token).await.unwrap();
    assert_eq!(resolved, user.id);

    let (status, _) = app.get("/lists/get-all", &user.token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_reject_missing_or_bad_token() {
    let app = create_test_app().await;

    let (status, body) = app
        .call(Method::GET, "/lists/get-all", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHENTICATED");

    let (status, body) = app.get("/lists/get-all", "not-a-session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_forgot_password() {
    let app = create_test_app().await;
    create_test_user(&app, "ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/forgot-password",
            None,
            Some(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/forgot-password",
            None,
            Some(json!({ "email": "nobody@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "EMAIL_NOT_FOUND");

    let (status, body) = app
        .call(Method::POST, "/auth/forgot-password", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_EMAIL");
}

#[tokio::test]
async fn test_reset_password() {
    let app = create_test_app().await;
    let user = create_test_user(&app, "ada@example.com").await;

    let (status, body) = app
        .post(
            "/auth/reset-password",
            &user.token,
            json!({ "password": "new-secret", "confirmPassword": "different" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "PASSWORD_MISMATCH");

    let (status, body) = app
        .post(
            "/auth/reset-password",
            &user.token,
            json!({ "password": "new-secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_FIELDS");

    let (status, body) = app
        .post(
            "/auth/reset-password",
            &user.token,
            json!({ "password": "correct horse", "confirmPassword": "correct horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "SAME_PASSWORD");

    let (status, _) = app
        .post(
            "/auth/reset-password",
            &user.token,
            json!({ "password": "new-secret", "confirmPassword": "new-secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/sign-in",
            None,
            Some(json!({ "email": "ada@example.com", "password": "new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_reset_password_requires_session() {
    let app = create_test_app().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/reset-password",
            None,
            Some(json!({ "password": "a", "confirmPassword": "a" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_identity_backend_failure_is_not_leaked() {
    let app = create_test_app().await;
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_sign_in()
        .returning(|_, _| Err(IdentityError::Backend("connection refused".into())));
    let router = api_router(AppState::new(app.core.clone(), Arc::new(identity)));
    let app = TestApp { router, ..app };

    let (status, body) = app
        .call(
            Method::POST,
            "/auth/sign-in",
            None,
            Some(json!({ "email": "ada@example.com", "password": "hunter22" })),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "INTERNAL_ERROR");
    assert_eq!(body["message"], "An unexpected error occurred");
}
