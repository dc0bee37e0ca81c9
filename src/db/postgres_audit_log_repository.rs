use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{audit_log_repository::AuditLogRepository, StoreResult};
use crate::models::audit::{AuditLog, NewAuditLog};

pub struct PostgresAuditLogRepository {
    pub pool: PgPool,
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn insert_audit_log(&self, entry: &NewAuditLog) -> StoreResult<AuditLog> {
        let log = sqlx::query_as::<_, AuditLog>(
            r#"
            INSERT INTO audit_logs (workspace_id, actor_id, action, target_type, target_id, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            RETURNING id, workspace_id, actor_id, action, target_type, target_id, metadata, created_at
            "#,
        )
        .bind(entry.workspace_id)
        .bind(entry.actor_id)
        .bind(entry.action.as_str())
        .bind(entry.action.target_type())
        .bind(entry.target_id)
        .bind(&entry.metadata)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    async fn list_audit_logs(&self, workspace_id: Uuid, limit: i64) -> StoreResult<Vec<AuditLog>> {
        let logs = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, workspace_id, actor_id, action, target_type, target_id, metadata, created_at
            FROM audit_logs
            WHERE workspace_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(workspace_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }
}
