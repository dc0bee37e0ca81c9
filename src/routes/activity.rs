use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{auth::session::AuthSession, auth_context, json_body};
use crate::errors::AppError;
use crate::services::with_timeout;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityPayload {
    pub workspace_id: Uuid,
    pub event_type: String,
}

/// Records a meaningful action for the caller; these events drive billing.
pub async fn record_activity(
    State(state): State<AppState>,
    session: AuthSession,
    payload: Result<Json<ActivityPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let payload = json_body(payload)?;
    let record = with_timeout(state.config.operation_timeout, async {
        state
            .activity()
            .record(
                &auth,
                payload.workspace_id,
                &payload.event_type,
                OffsetDateTime::now_utc(),
            )
            .await
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "activity": record })),
    ))
}
