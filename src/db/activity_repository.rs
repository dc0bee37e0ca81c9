use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use time::OffsetDateTime;
use uuid::Uuid;

use super::StoreResult;
use crate::models::activity::ActivityRecord;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn record_activity(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        event_type: &str,
        at: OffsetDateTime,
    ) -> StoreResult<ActivityRecord>;

    /// Distinct users with at least one event in `[since, until)`.
    async fn list_active_user_ids(
        &self,
        workspace_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> StoreResult<Vec<Uuid>>;
}
