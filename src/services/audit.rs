use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::db::audit_log_repository::AuditLogRepository;
use crate::errors::AppError;
use crate::models::audit::{AuditLog, NewAuditLog};

pub const MAX_AUDIT_PAGE: i64 = 200;
pub const DEFAULT_AUDIT_PAGE: i64 = 50;

/// Best-effort audit trail. A failed write is logged and never fails the
/// operation being audited.
#[derive(Clone)]
pub struct AuditLogger {
    repo: Arc<dyn AuditLogRepository>,
}

impl AuditLogger {
    pub fn new(repo: Arc<dyn AuditLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(&self, entry: NewAuditLog) {
        if let Err(err) = self.repo.insert_audit_log(&entry).await {
            warn!(
                workspace_id = %entry.workspace_id,
                action = entry.action.as_str(),
                error = %err,
                "failed to write audit log"
            );
        }
    }

    pub async fn list(&self, workspace_id: Uuid, limit: Option<i64>) -> Result<Vec<AuditLog>, AppError> {
        let limit = clamp_limit(limit);
        Ok(self.repo.list_audit_logs(workspace_id, limit).await?)
    }
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_AUDIT_PAGE).clamp(1, MAX_AUDIT_PAGE)
}
