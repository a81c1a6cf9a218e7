//! HTTP handlers organized by domain:
//! - auth: sign-up, sign-in, forgot / reset password
//! - lists: create, get-all, delete, leave, remove-member
//! - invites: issue, refresh, history, join
//! - items: add, get-all, delete, update-status
//! - activity: list activity feed
//! - subscribe: server-sent item change events

pub mod activity;
pub mod auth;
pub mod invites;
pub mod items;
pub mod lists;
pub mod subscribe;
