//! Strongly-typed identifiers (avoid mixing strings/UUIDs arbitrarily).

use uuid::Uuid;

/// User identifier, issued by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

/// Shopping list identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListId(pub Uuid);

/// Membership row identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MembershipId(pub Uuid);

/// Invite token row identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InviteId(pub Uuid);

/// List item identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemId(pub Uuid);
