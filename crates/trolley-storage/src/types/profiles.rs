//! User profile projection.

use chrono::{DateTime, Utc};

use super::UserId;

/// Public profile of a user (the roster view of an identity-provider user)
#[derive(Clone, Debug)]
pub struct Profile {
    pub id: UserId,
    pub email: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a profile after sign-up
#[derive(Clone, Debug)]
pub struct CreateProfileParams {
    pub id: UserId,
    pub email: String,
    pub username: Option<String>,
}
