//! Auth handlers: sign-up, sign-in, forgot-password, reset-password

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use trolley_storage::{CreateProfileParams, StoreError};

use crate::api::{
    present, CredentialsRequest, ForgotPasswordRequest, MessageResponse, ResetPasswordRequest,
    SignInResponse, SignUpResponse,
};
use crate::error::ApiError;
use crate::extract::{AuthUser, JsonBody};
use crate::server::AppState;

fn credentials(req: &CredentialsRequest) -> Result<(&str, &str), ApiError> {
    let email = present(&req.email);
    // Passwords are taken verbatim.
    let password = req.password.as_deref().filter(|p| !p.is_empty());
    match (email, password) {
        (Some(email), Some(password)) => Ok((email, password)),
        _ => Err(ApiError::missing_fields("Email and password are required")),
    }
}

pub async fn sign_up(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), ApiError> {
    let (email, password) = credentials(&req)?;

    let user_id = state.identity.sign_up(email, password).await?;

    let username = email.split('@').next().unwrap_or(email).to_string();
    let profile = state
        .core
        .store()
        .create_profile(&CreateProfileParams {
            id: user_id.clone(),
            email: email.to_lowercase(),
            username: Some(username),
        })
        .await;

    if let Err(e) = profile {
        tracing::error!(user_id = %user_id.0, error = %e, "profile creation failed, removing user");
        if let Err(cleanup) = state.identity.delete_user(&user_id).await {
            tracing::error!(user_id = %user_id.0, error = %cleanup, "failed to remove user after profile error");
        }
        // The identity provider accepted the email but a profile already
        // holds it, so the address is taken.
        if matches!(e, StoreError::AlreadyExists) {
            return Err(ApiError::new(
                StatusCode::CONFLICT,
                "EMAIL_EXISTS",
                "Email already registered",
            ));
        }
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "PROFILE_CREATION_ERROR",
            "Failed to create user profile",
        ));
    }

    tracing::info!(user_id = %user_id.0, "user signed up");
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            success: true,
            message: "Account created".to_string(),
            user_id: user_id.0,
        }),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CredentialsRequest>,
) -> Result<Json<SignInResponse>, ApiError> {
    let (email, password) = credentials(&req)?;

    let session = state.identity.sign_in(email, password).await?;

    Ok(Json(SignInResponse {
        success: true,
        message: "Successfully signed in".to_string(),
        access_token: session.access_token,
        user_id: session.user_id.0,
        expires_at: session.expires_at,
    }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = present(&req.email)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "MISSING_EMAIL", "Email is required"))?;

    // No mail integration: the recovery session is not delivered anywhere.
    let _recovery = state.identity.request_password_reset(email).await?;

    Ok(Json(MessageResponse::ok(
        "Check your email for a link to reset your password",
    )))
}

pub async fn reset_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (password, confirm) = match (
        req.password.as_deref().filter(|p| !p.is_empty()),
        req.confirm_password.as_deref().filter(|p| !p.is_empty()),
    ) {
        (Some(p), Some(c)) => (p, c),
        _ => {
            return Err(ApiError::missing_fields(
                "Password and confirm password are required",
            ))
        }
    };
    if password != confirm {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "PASSWORD_MISMATCH",
            "Passwords do not match",
        ));
    }

    state.identity.reset_password(&user_id, password).await?;

    tracing::info!(user_id = %user_id.0, "password updated");
    Ok(Json(MessageResponse::ok("Password updated successfully")))
}
