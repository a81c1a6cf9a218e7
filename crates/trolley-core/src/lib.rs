//! Business rules for trolley: the membership guard, the invite token
//! lifecycle and list/item management.
//!
//! Every mutating operation authorizes through [`guard::authorize`], then
//! writes through the [`Store`], then records activity and publishes item
//! changes. Activity and events are best-effort and never fail a request.

use std::sync::Arc;

use chrono::Duration;
use trolley_activity::{ActivityEvent, ActivityLog};
use trolley_events::{EventBus, ItemChangeEvent};
use trolley_storage::{ListId, Store};

pub mod activity;
pub mod error;
pub mod guard;
pub mod invites;
pub mod items;
pub mod lists;

#[cfg(test)]
mod testing;

pub use error::{CoreError, DenyReason, ErrorKind};
pub use guard::Access;
pub use invites::Issued;
pub use items::NewItem;
pub use lists::{ListWithMembers, MemberInfo};

/// Settings the managers need at runtime.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// Origin used to build invite links, without trailing slash.
    pub public_origin: String,
    pub invite_ttl: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            public_origin: "http://localhost:3000".to_string(),
            invite_ttl: Duration::hours(72),
        }
    }
}

pub struct Core {
    store: Arc<dyn Store>,
    events: Arc<dyn EventBus>,
    activity: Arc<dyn ActivityLog>,
    config: CoreConfig,
}

impl Core {
    pub fn new(
        store: Arc<dyn Store>,
        events: Arc<dyn EventBus>,
        activity: Arc<dyn ActivityLog>,
        config: CoreConfig,
    ) -> Self {
        Self {
            store,
            events,
            activity,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn events(&self) -> &Arc<dyn EventBus> {
        &self.events
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    async fn record(&self, event: ActivityEvent) {
        let kind = event.activity_type;
        if let Err(e) = self.activity.record(event).await {
            tracing::warn!(activity = %kind, error = %e, "failed to record activity");
        }
    }

    async fn publish(&self, list_id: &ListId, event: ItemChangeEvent) {
        if let Err(e) = self.events.publish(list_id, event).await {
            tracing::warn!(list_id = %list_id.0, error = %e, "failed to publish item change");
        }
    }
}
