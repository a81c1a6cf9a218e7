//! Identity gateway for trolley.
//!
//! The server never sees password hashes or session storage directly: it
//! authenticates bearer tokens and drives the sign-up / sign-in / reset flows
//! through [`IdentityProvider`]. [`PasswordIdentityProvider`] implements it
//! over any [`CredentialStore`]; the server keeps credentials in its SQLite
//! database, tests use [`MemoryCredentialStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use trolley_storage::UserId;

mod credentials;
mod memory;
mod provider;

pub use credentials::{CredentialStore, StoredSession, UserCredentials};
pub use memory::MemoryCredentialStore;
pub use provider::{KdfCost, PasswordIdentityProvider};

/// Errors surfaced by identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("missing, unknown or expired token")]
    InvalidToken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("email already registered")]
    EmailTaken,
    #[error("no account for this email")]
    UnknownEmail,
    #[error("new password must differ from the current one")]
    SamePassword,
    #[error("user not found")]
    UserNotFound,
    #[error("identity backend error: {0}")]
    Backend(String),
}

/// A bearer session handed out by sign-in (or by a password-reset request).
#[derive(Clone)]
pub struct Session {
    pub access_token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the user it was issued for.
    async fn authenticate(&self, token: &str) -> Result<UserId, IdentityError>;

    /// Register a new user. `EmailTaken` if the email is already registered.
    async fn sign_up(&self, email: &str, password: &str) -> Result<UserId, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    /// Remove a user and every session issued for them.
    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError>;

    /// Start a password reset.
    ///
    /// Returns a short-lived recovery session; delivering it to the user
    /// (e.g. by email) is the caller's concern.
    async fn request_password_reset(&self, email: &str) -> Result<Session, IdentityError>;

    /// Replace the password of an authenticated user.
    async fn reset_password(
        &self,
        user_id: &UserId,
        new_password: &str,
    ) -> Result<(), IdentityError>;
}
