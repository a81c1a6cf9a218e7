use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use trolley_core::Core;
use trolley_identity::IdentityProvider;
use trolley_store_sqlite::SqliteStore;

use crate::handlers::{activity, auth, invites, items, lists, subscribe};
use crate::metrics::{metrics_handler, track_http};

/// Shared state handed to every API handler.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<Core>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(core: Arc<Core>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { core, identity }
    }
}

/// The public JSON API.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/lists/create", post(lists::create_list))
        .route("/lists/get-all", get(lists::get_lists))
        .route("/lists/delete", delete(lists::delete_list))
        .route("/lists/leave", post(lists::leave_list))
        .route("/lists/remove-member", post(lists::remove_member))
        .route("/lists/invite", post(invites::issue_invite))
        .route("/lists/refresh-invite-token", post(invites::refresh_invite))
        .route("/lists/invites", get(invites::invite_history))
        .route("/lists/join", post(invites::join_list))
        .route("/lists/activity", get(activity::list_activity))
        .route("/list-items/add", post(items::add_item))
        .route("/list-items/get-all", get(items::get_items))
        .route("/list-items/delete", delete(items::delete_item))
        .route("/list-items/update-status", patch(items::update_status))
        .route("/list-items/subscribe", get(subscribe::subscribe))
        .route_layer(middleware::from_fn(track_http))
        .with_state(state)
}

#[derive(Clone)]
pub struct ReadinessCheck {
    ready: tokio::sync::watch::Receiver<bool>,
    store: Option<Arc<SqliteStore>>,
}

impl ReadinessCheck {
    pub fn new(ready: tokio::sync::watch::Receiver<bool>) -> Self {
        Self { ready, store: None }
    }

    /// Also require the database to answer before reporting ready.
    pub fn with_store(mut self, store: Arc<SqliteStore>) -> Self {
        self.store = Some(store);
        self
    }
}

/// Liveness, readiness and metrics, served on their own port.
pub fn health_router(check: ReadinessCheck, metrics: PrometheusHandle) -> Router {
    let probes = Router::new()
        .route("/healthz", get(health_handler))
        .route("/readyz", get(readiness_handler))
        .with_state(check);
    let scrape = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);
    probes.merge(scrape)
}

pub async fn health_handler() -> &'static str {
    "ok"
}

pub async fn readiness_handler(
    State(check): State<ReadinessCheck>,
) -> Result<&'static str, StatusCode> {
    if !*check.ready.borrow() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    if let Some(store) = &check.store {
        if let Err(e) = store.ping().await {
            tracing::warn!(error = %e, "readiness probe: database unavailable");
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    }
    Ok("ok")
}
