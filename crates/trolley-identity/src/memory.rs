//! In-process credential store. State lives for the lifetime of the process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use trolley_storage::UserId;

use crate::credentials::{CredentialStore, StoredSession, UserCredentials};
use crate::IdentityError;

#[derive(Default)]
pub struct MemoryCredentialStore {
    users: DashMap<UserId, UserCredentials>,
    emails: DashMap<String, UserId>,
    sessions: DashMap<String, StoredSession>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, live or expired.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert_user(&self, user: &UserCredentials) -> Result<(), IdentityError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(IdentityError::EmailTaken),
            Entry::Vacant(slot) => {
                slot.insert(user.user_id.clone());
            }
        }
        self.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserCredentials>, IdentityError> {
        let Some(user_id) = self.emails.get(email).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn user_by_id(&self, user_id: &UserId) -> Result<Option<UserCredentials>, IdentityError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn set_password_hash(
        &self,
        user_id: &UserId,
        password_hash: &str,
    ) -> Result<(), IdentityError> {
        match self.users.get_mut(user_id) {
            Some(mut u) => {
                u.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(IdentityError::UserNotFound),
        }
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<(), IdentityError> {
        let (_, record) = self
            .users
            .remove(user_id)
            .ok_or(IdentityError::UserNotFound)?;
        self.emails.remove(&record.email);
        self.sessions.retain(|_, s| &s.user_id != user_id);
        Ok(())
    }

    async fn insert_session(
        &self,
        digest: &str,
        session: &StoredSession,
    ) -> Result<(), IdentityError> {
        self.sessions.insert(digest.to_string(), session.clone());
        Ok(())
    }

    async fn get_session(&self, digest: &str) -> Result<Option<StoredSession>, IdentityError> {
        Ok(self.sessions.get(digest).map(|s| s.value().clone()))
    }

    async fn delete_session(&self, digest: &str) -> Result<(), IdentityError> {
        self.sessions.remove(digest);
        Ok(())
    }

    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, IdentityError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}
