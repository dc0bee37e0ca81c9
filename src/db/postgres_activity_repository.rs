use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{activity_repository::ActivityRepository, StoreResult};
use crate::models::activity::ActivityRecord;

pub struct PostgresActivityRepository {
    pub pool: PgPool,
}

#[async_trait]
impl ActivityRepository for PostgresActivityRepository {
    async fn record_activity(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        event_type: &str,
        at: OffsetDateTime,
    ) -> StoreResult<ActivityRecord> {
        let record = sqlx::query_as::<_, ActivityRecord>(
            r#"
            INSERT INTO activity_events (workspace_id, user_id, event_type, occurred_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, workspace_id, user_id, event_type, occurred_at
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(event_type)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_active_user_ids(
        &self,
        workspace_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT user_id
            FROM activity_events
            WHERE workspace_id = $1 AND occurred_at >= $2 AND occurred_at < $3
            "#,
        )
        .bind(workspace_id)
        .bind(since)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
