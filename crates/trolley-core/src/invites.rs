//! Invite tokens: issue, rotate, redeem.
//!
//! Per list the token moves NoToken -> Active -> Invalidated while a fresh
//! Active one replaces it. The store's partial unique index guarantees at
//! most one active token per list even under concurrent rotation.

use chrono::Utc;
use rand_core::{OsRng, RngCore};
use trolley_activity::{ActivityEvent, ActivityType};
use trolley_storage::{
    AddMembershipParams, CreateInviteParams, Invite, ListId, ListRole, Membership, StoreError,
    UserId,
};

use crate::error::store_err;
use crate::{Core, CoreError};

pub const TOKEN_LEN: usize = 10;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Draw a fresh token from the OS CSPRNG.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    OsRng.fill_bytes(&mut bytes);
    // 64 symbols: masking the low 6 bits is unbiased.
    bytes
        .iter()
        .map(|b| ALPHABET[(b & 63) as usize] as char)
        .collect()
}

pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| ALPHABET.contains(&b))
}

/// Outcome of `issue_invite`.
#[derive(Clone, Debug)]
pub enum Issued {
    /// The current active token was still valid and is returned as is.
    Existing(Invite),
    /// A new token replaced the previous one.
    Rotated(Invite),
}

impl Issued {
    pub fn invite(&self) -> &Invite {
        match self {
            Issued::Existing(i) | Issued::Rotated(i) => i,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Issued::Rotated(_))
    }
}

impl Core {
    /// Return the list's active token, or mint one when there is none, it
    /// expired, or `rotate` is set. Owner only.
    pub async fn issue_invite(
        &self,
        list_id: &ListId,
        user_id: &UserId,
        rotate: bool,
    ) -> Result<Issued, CoreError> {
        self.require(user_id, list_id, Some(ListRole::Owner)).await?;

        if !rotate {
            match self.store.get_active_invite(list_id).await {
                Ok(invite) if invite.is_redeemable_at(Utc::now()) => {
                    return Ok(Issued::Existing(invite));
                }
                Ok(_) | Err(StoreError::NotFound) => {}
                Err(e) => return Err(store_err("get_active_invite")(e)),
            }
        }

        self.rotate_unchecked(list_id, user_id)
            .await
            .map(Issued::Rotated)
    }

    /// Invalidate the current token and mint a new one. Owner only.
    pub async fn rotate_invite(
        &self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<Invite, CoreError> {
        self.require(user_id, list_id, Some(ListRole::Owner)).await?;
        self.rotate_unchecked(list_id, user_id).await
    }

    async fn rotate_unchecked(
        &self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<Invite, CoreError> {
        let mut retried = false;
        loop {
            let params = CreateInviteParams {
                list_id: list_id.clone(),
                token: generate_token(),
                created_by: user_id.clone(),
                expires_at: Utc::now() + self.config.invite_ttl,
            };

            match self.store.rotate_invite(&params).await {
                Ok(invite) => {
                    tracing::info!(list_id = %list_id.0, "invite token rotated");
                    self.record(
                        ActivityEvent::builder(list_id, user_id, ActivityType::InviteRotated)
                            .build(),
                    )
                    .await;
                    return Ok(invite);
                }
                Err(StoreError::AlreadyExists) if !retried => {
                    tracing::warn!(list_id = %list_id.0, "invite token collision, regenerating");
                    retried = true;
                }
                Err(StoreError::AlreadyExists) => {
                    tracing::error!(list_id = %list_id.0, "invite token collided twice");
                    return Err(CoreError::Internal("could not allocate invite token".into()));
                }
                Err(StoreError::Conflict) => {
                    return Err(CoreError::Conflict(
                        "invite was rotated concurrently".into(),
                    ));
                }
                Err(StoreError::NotFound) => return Err(CoreError::NotFound("list")),
                Err(e) => return Err(store_err("rotate_invite")(e)),
            }
        }
    }

    /// Join the list behind `token` as a member.
    pub async fn redeem_invite(
        &self,
        token: &str,
        user_id: &UserId,
    ) -> Result<Membership, CoreError> {
        if !is_well_formed(token) {
            return Err(CoreError::InvalidInvite);
        }

        let invite = match self.store.get_invite_by_token(token).await {
            Ok(invite) => invite,
            Err(StoreError::NotFound) => return Err(CoreError::InvalidInvite),
            Err(e) => return Err(store_err("get_invite_by_token")(e)),
        };
        if !invite.is_redeemable_at(Utc::now()) {
            return Err(CoreError::InvalidInvite);
        }

        match self.store.get_membership(&invite.list_id, user_id).await {
            Ok(_) => return Err(CoreError::AlreadyMember),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(store_err("get_membership")(e)),
        }

        // The (list, user) unique index settles a racing second redeem.
        let membership = match self
            .store
            .add_membership(&AddMembershipParams {
                list_id: invite.list_id.clone(),
                user_id: user_id.clone(),
                role: ListRole::Member,
            })
            .await
        {
            Ok(m) => m,
            Err(StoreError::AlreadyExists) => return Err(CoreError::AlreadyMember),
            Err(StoreError::NotFound) => return Err(CoreError::InvalidInvite),
            Err(e) => return Err(store_err("add_membership")(e)),
        };

        tracing::info!(list_id = %invite.list_id.0, user_id = %user_id.0, "member joined via invite");
        self.record(
            ActivityEvent::builder(&invite.list_id, user_id, ActivityType::MemberAdded)
                .target_user(user_id)
                .build(),
        )
        .await;
        Ok(membership)
    }

    pub fn invite_link(&self, token: &str) -> String {
        format!(
            "{}/list-invite/{}",
            self.config.public_origin.trim_end_matches('/'),
            token
        )
    }

    /// Every token ever issued for the list, oldest first. Owner only.
    pub async fn invite_history(
        &self,
        list_id: &ListId,
        user_id: &UserId,
    ) -> Result<Vec<Invite>, CoreError> {
        self.require(user_id, list_id, Some(ListRole::Owner)).await?;
        self.store
            .list_invites(list_id)
            .await
            .map_err(store_err("list_invites"))
    }
}
