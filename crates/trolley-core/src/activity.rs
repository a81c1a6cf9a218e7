//! Read side of the activity log.

use trolley_activity::{ActivityEvent, ActivityFilter};
use trolley_storage::{ListId, UserId};

use crate::{Core, CoreError};

pub const DEFAULT_ACTIVITY_LIMIT: u32 = 50;
pub const MAX_ACTIVITY_LIMIT: u32 = 200;

impl Core {
    /// Most recent activity on a list, newest first. Members only.
    pub async fn list_activity(
        &self,
        list_id: &ListId,
        user_id: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<ActivityEvent>, CoreError> {
        self.require(user_id, list_id, None).await?;

        let limit = limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT);
        self.activity
            .list(ActivityFilter::for_list(list_id.clone()).limit(limit))
            .await
            .map_err(|e| {
                tracing::error!(list_id = %list_id.0, error = %e, "failed to read activity");
                CoreError::Internal("list_activity failed".into())
            })
    }
}
