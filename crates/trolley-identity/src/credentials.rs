//! Persistence seam for the password identity provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trolley_storage::UserId;

use crate::IdentityError;

/// A registered account as the credential store keeps it.
#[derive(Clone)]
pub struct UserCredentials {
    pub user_id: UserId,
    /// Normalized (trimmed, lowercased).
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredSession {
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// Users and sessions behind [`crate::PasswordIdentityProvider`].
///
/// Sessions are keyed by the sha256 hex digest of the bearer token; the
/// token itself is never stored.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `EmailTaken` if the email is already registered.
    async fn insert_user(&self, user: &UserCredentials) -> Result<(), IdentityError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<UserCredentials>, IdentityError>;

    async fn user_by_id(&self, user_id: &UserId) -> Result<Option<UserCredentials>, IdentityError>;

    /// `UserNotFound` if the user does not exist.
    async fn set_password_hash(
        &self,
        user_id: &UserId,
        password_hash: &str,
    ) -> Result<(), IdentityError>;

    /// Remove the user along with every session issued for them.
    /// `UserNotFound` if the user does not exist.
    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError>;

    async fn insert_session(
        &self,
        digest: &str,
        session: &StoredSession,
    ) -> Result<(), IdentityError>;

    async fn get_session(&self, digest: &str) -> Result<Option<StoredSession>, IdentityError>;

    async fn delete_session(&self, digest: &str) -> Result<(), IdentityError>;

    /// Drop sessions that expired at or before `now`; returns how many.
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, IdentityError>;
}
