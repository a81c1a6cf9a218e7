//! Type definitions for trolley storage.

mod ids;
mod invites;
mod items;
mod lists;
mod profiles;
mod roles;

// Re-export all types from submodules
pub use ids::*;
pub use invites::*;
pub use items::*;
pub use lists::*;
pub use profiles::*;
pub use roles::*;
