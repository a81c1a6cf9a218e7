//! Membership roles and item status values.

use std::str::FromStr;

/// Role a user holds on a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListRole {
    Owner,
    Member,
    ReadOnly,
}

/// Error type for parsing ListRole from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseListRoleError(pub String);

impl std::fmt::Display for ParseListRoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid list role: {}", self.0)
    }
}

impl std::error::Error for ParseListRoleError {}

impl FromStr for ListRole {
    type Err = ParseListRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(ListRole::Owner),
            "member" => Ok(ListRole::Member),
            "read-only" => Ok(ListRole::ReadOnly),
            _ => Err(ParseListRoleError(s.to_string())),
        }
    }
}

impl ListRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListRole::Owner => "owner",
            ListRole::Member => "member",
            ListRole::ReadOnly => "read-only",
        }
    }

    /// Check if this role has at least the permissions of another role
    pub fn includes(&self, other: &ListRole) -> bool {
        match self {
            ListRole::Owner => true,
            ListRole::Member => matches!(other, ListRole::Member | ListRole::ReadOnly),
            ListRole::ReadOnly => matches!(other, ListRole::ReadOnly),
        }
    }
}

/// Progress of a list item. Any status may move to any other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Open,
    Pending,
    Done,
}

/// Error type for parsing ItemStatus from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseItemStatusError(pub String);

impl std::fmt::Display for ParseItemStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid item status: {}", self.0)
    }
}

impl std::error::Error for ParseItemStatusError {}

impl FromStr for ItemStatus {
    type Err = ParseItemStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ItemStatus::Open),
            "pending" => Ok(ItemStatus::Pending),
            "done" => Ok(ItemStatus::Done),
            _ => Err(ParseItemStatusError(s.to_string())),
        }
    }
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Open => "open",
            ItemStatus::Pending => "pending",
            ItemStatus::Done => "done",
        }
    }
}
