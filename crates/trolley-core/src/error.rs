use thiserror::Error;
use trolley_storage::StoreError;

/// Why the guard (or an ownership check) refused an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    NotAMember,
    NotOwner,
    InsufficientRole,
    NotCreator,
    NotItemOwner,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotAMember => "not-a-member",
            DenyReason::NotOwner => "not-owner",
            DenyReason::InsufficientRole => "insufficient-role",
            DenyReason::NotCreator => "not-creator",
            DenyReason::NotItemOwner => "not-item-owner",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error taxonomy shared by every operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Unauthorized,
    NotFound,
    Conflict,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "UNAUTHENTICATED",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unauthorized: {0}")]
    Unauthorized(DenyReason),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invite token is invalid or expired")]
    InvalidInvite,
    #[error("already a member of this list")]
    AlreadyMember,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Unauthorized(_) => ErrorKind::Unauthorized,
            CoreError::NotFound(_) | CoreError::InvalidInvite => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Validation(_) | CoreError::AlreadyMember => ErrorKind::Validation,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }
}

/// Map a store failure for `op`, logging backend errors before they are
/// flattened into `Internal`.
pub(crate) fn store_err(op: &'static str) -> impl FnOnce(StoreError) -> CoreError {
    move |e| match e {
        StoreError::NotFound => CoreError::NotFound("resource"),
        StoreError::AlreadyExists => CoreError::Conflict(format!("{op}: already exists")),
        StoreError::Conflict => CoreError::Conflict(format!("{op}: concurrent update")),
        StoreError::Backend(msg) => {
            tracing::error!(op, error = %msg, "store operation failed");
            CoreError::Internal(format!("{op} failed"))
        }
    }
}
