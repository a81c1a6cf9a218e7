//! HTTP error responses.
//!
//! Every failure leaves the server as `{"success": false, "message", "error"}`
//! with `error` a stable machine-readable code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use trolley_core::{CoreError, ErrorKind};
use trolley_identity::IdentityError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    error: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ErrorKind::Unauthenticated.code(),
            "Authentication required",
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::Validation.code(),
            message,
        )
    }

    pub fn missing_fields(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "MISSING_FIELDS", message)
    }

    /// An internal failure. The cause is logged, never returned.
    pub fn internal(context: &str, cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "{context}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Internal.code(),
            "An unexpected error occurred",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        let kind = e.kind();
        if kind == ErrorKind::Internal {
            return ApiError::internal("request failed", &e);
        }
        let message = match &e {
            CoreError::Unauthorized(reason) => {
                format!("Access denied: {reason}")
            }
            CoreError::NotFound(what) => {
                let mut chars = what.chars();
                match chars.next() {
                    Some(first) => format!("{}{} not found", first.to_uppercase(), chars.as_str()),
                    None => "Not found".to_string(),
                }
            }
            CoreError::InvalidInvite => "Invalid or expired invite token".to_string(),
            CoreError::AlreadyMember => "You are already a member of this list".to_string(),
            other => other.to_string(),
        };
        ApiError::new(status_for(kind), kind.code(), message)
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::InvalidToken => ApiError::unauthenticated(),
            IdentityError::InvalidCredentials => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid login credentials",
            ),
            IdentityError::EmailTaken => ApiError::new(
                StatusCode::CONFLICT,
                "EMAIL_EXISTS",
                "Email already registered",
            ),
            IdentityError::UnknownEmail => ApiError::new(
                StatusCode::NOT_FOUND,
                "EMAIL_NOT_FOUND",
                "No account found with this email",
            ),
            IdentityError::SamePassword => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "SAME_PASSWORD",
                "New password must be different from your current password",
            ),
            IdentityError::UserNotFound => ApiError::unauthenticated(),
            IdentityError::Backend(msg) => ApiError::internal("identity provider failed", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            message: &self.message,
            error: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}
