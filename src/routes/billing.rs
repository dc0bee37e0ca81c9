use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{auth::session::AuthSession, auth_context};
use crate::errors::AppError;
use crate::services::{access::require_admin, with_timeout};
use crate::state::AppState;

/// Fair-usage bill for the trailing window ending now. Admins and owners only.
pub async fn get_billing(
    State(state): State<AppState>,
    session: AuthSession,
    Path(workspace_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let report = with_timeout(state.config.operation_timeout, async {
        require_admin(state.user_repo.as_ref(), &auth, workspace_id).await?;
        state
            .billing()
            .calculate(workspace_id, OffsetDateTime::now_utc())
            .await
    })
    .await?;

    Ok(Json(json!({ "success": true, "billing": report })))
}
