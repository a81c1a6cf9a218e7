//! Password identity provider: argon2id password hashes, sha256-digested
//! bearer tokens, users and sessions kept in a [`CredentialStore`].

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use trolley_storage::UserId;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::credentials::{CredentialStore, StoredSession, UserCredentials};
use crate::memory::MemoryCredentialStore;
use crate::{IdentityError, IdentityProvider, Session};

const MIB: u32 = 1024;

/// Argon2id cost parameters for password hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfCost {
    pub m_cost_kib: u32, // memory cost (KiB)
    pub t_cost: u32,     // iterations
    pub p_cost: u32,     // parallelism
}

impl KdfCost {
    pub fn interactive() -> Self {
        Self {
            m_cost_kib: 19 * MIB,
            t_cost: 2,
            p_cost: 1,
        }
    }

    /// Minimum legal cost. Tests only.
    pub fn testing() -> Self {
        Self {
            m_cost_kib: 8,
            t_cost: 1,
            p_cost: 1,
        }
    }
}

impl Default for KdfCost {
    fn default() -> Self {
        Self::interactive()
    }
}

pub struct PasswordIdentityProvider {
    credentials: Arc<dyn CredentialStore>,
    cost: KdfCost,
    session_ttl: Duration,
    recovery_ttl: Duration,
}

impl PasswordIdentityProvider {
    pub fn new(credentials: Arc<dyn CredentialStore>, cost: KdfCost) -> Self {
        Self {
            credentials,
            cost,
            session_ttl: Duration::hours(24),
            recovery_ttl: Duration::hours(1),
        }
    }

    /// Provider whose users and sessions vanish with the process.
    pub fn in_memory(cost: KdfCost) -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()), cost)
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    async fn issue_session(&self, user_id: &UserId, ttl: Duration) -> Result<Session, IdentityError> {
        let now = Utc::now();
        // Expired sessions are swept here so the table stays bounded.
        match self.credentials.purge_expired_sessions(now).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(count = n, "expired sessions purged"),
            Err(e) => tracing::warn!(error = %e, "failed to purge expired sessions"),
        }

        let token = new_token();
        let expires_at = now + ttl;
        self.credentials
            .insert_session(
                &token_digest(&token),
                &StoredSession {
                    user_id: user_id.clone(),
                    expires_at,
                },
            )
            .await?;
        Ok(Session {
            access_token: token.to_string(),
            user_id: user_id.clone(),
            expires_at,
        })
    }

    async fn hash(&self, password: &str) -> Result<String, IdentityError> {
        let cost = self.cost;
        let password = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || hash_password(cost, &password))
            .await
            .map_err(|e| IdentityError::Backend(e.to_string()))?
    }

    async fn verify(&self, phc: String, password: &str) -> Result<bool, IdentityError> {
        let password = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || verify_password(&phc, &password))
            .await
            .map_err(|e| IdentityError::Backend(e.to_string()))?
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_token() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(bytes.as_mut());
    Zeroizing::new(hex::encode(bytes.as_ref()))
}

fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn hash_password(cost: KdfCost, password: &str) -> Result<String, IdentityError> {
    let params = Params::new(cost.m_cost_kib, cost.t_cost, cost.p_cost, None)
        .map_err(|e| IdentityError::Backend(format!("invalid kdf parameters: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| IdentityError::Backend(format!("password hashing failed: {e}")))
}

fn verify_password(phc: &str, password: &str) -> Result<bool, IdentityError> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| IdentityError::Backend(format!("corrupt password hash: {e}")))?;
    // Parameters come from the PHC string.
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[async_trait]
impl IdentityProvider for PasswordIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<UserId, IdentityError> {
        let digest = token_digest(token);
        match self.credentials.get_session(&digest).await? {
            Some(s) if s.expires_at > Utc::now() => Ok(s.user_id),
            Some(_) => {
                self.credentials.delete_session(&digest).await?;
                Err(IdentityError::InvalidToken)
            }
            None => Err(IdentityError::InvalidToken),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<UserId, IdentityError> {
        let email = normalize_email(email);
        if self.credentials.user_by_email(&email).await?.is_some() {
            return Err(IdentityError::EmailTaken);
        }
        let password_hash = self.hash(password).await?;

        let user_id = UserId(Uuid::new_v4());
        // A racing sign-up for the same email loses here.
        self.credentials
            .insert_user(&UserCredentials {
                user_id: user_id.clone(),
                email,
                password_hash,
            })
            .await?;
        tracing::info!(user_id = %user_id.0, "user registered");
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let email = normalize_email(email);
        let Some(user) = self.credentials.user_by_email(&email).await? else {
            return Err(IdentityError::InvalidCredentials);
        };
        if !self.verify(user.password_hash, password).await? {
            return Err(IdentityError::InvalidCredentials);
        }
        self.issue_session(&user.user_id, self.session_ttl).await
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError> {
        self.credentials.delete_user(user_id).await?;
        tracing::info!(user_id = %user_id.0, "user deleted");
        Ok(())
    }

    async fn request_password_reset(&self, email: &str) -> Result<Session, IdentityError> {
        let email = normalize_email(email);
        let user = self
            .credentials
            .user_by_email(&email)
            .await?
            .ok_or(IdentityError::UnknownEmail)?;
        tracing::info!(user_id = %user.user_id.0, "password reset requested");
        self.issue_session(&user.user_id, self.recovery_ttl).await
    }

    async fn reset_password(
        &self,
        user_id: &UserId,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let current = self
            .credentials
            .user_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;
        if self.verify(current.password_hash, new_password).await? {
            return Err(IdentityError::SamePassword);
        }
        let password_hash = self.hash(new_password).await?;
        self.credentials
            .set_password_hash(user_id, &password_hash)
            .await
    }
}
