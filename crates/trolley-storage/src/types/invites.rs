//! Invite token types.

use chrono::{DateTime, Utc};

use super::{InviteId, ListId, UserId};

/// Invite token record
#[derive(Clone, Debug)]
pub struct Invite {
    pub id: InviteId,
    pub list_id: ListId,
    pub token: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub invalidated_at: Option<DateTime<Utc>>, // Set when rotated away
}

impl Invite {
    /// Not invalidated (expiry is checked separately).
    pub fn is_active(&self) -> bool {
        self.invalidated_at.is_none()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Active and not yet expired.
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && !self.is_expired_at(now)
    }
}

/// Parameters for creating (or rotating in) an invite token
#[derive(Clone, Debug)]
pub struct CreateInviteParams {
    pub list_id: ListId,
    pub token: String,
    pub created_by: UserId,
    pub expires_at: DateTime<Utc>,
}
