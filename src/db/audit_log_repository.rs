use async_trait::async_trait;
use uuid::Uuid;

use super::StoreResult;
use crate::models::audit::{AuditLog, NewAuditLog};

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn insert_audit_log(&self, entry: &NewAuditLog) -> StoreResult<AuditLog>;

    /// Newest first.
    async fn list_audit_logs(&self, workspace_id: Uuid, limit: i64) -> StoreResult<Vec<AuditLog>>;
}
