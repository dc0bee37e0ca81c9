use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{auth::session::AuthSession, auth_context};
use crate::errors::AppError;
use crate::services::{access::require_admin, with_timeout};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    session: AuthSession,
    Path(workspace_id): Path<Uuid>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let logs = with_timeout(state.config.operation_timeout, async {
        require_admin(state.user_repo.as_ref(), &auth, workspace_id).await?;
        state.audit_logger().list(workspace_id, query.limit).await
    })
    .await?;

    Ok(Json(json!({ "success": true, "logs": logs })))
}
