use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::{auth::session::AuthSession, auth_context, json_body};
use crate::errors::AppError;
use crate::services::{invitations::CreateInvitation, with_timeout};
use crate::state::AppState;

pub async fn list_invitations(
    State(state): State<AppState>,
    session: AuthSession,
    Path(workspace_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let invitations = with_timeout(state.config.operation_timeout, async {
        state
            .invitations()
            .list_invitations(&auth, workspace_id)
            .await
    })
    .await?;

    Ok(Json(json!({ "success": true, "invitations": invitations })))
}

pub async fn create_invitation(
    State(state): State<AppState>,
    session: AuthSession,
    Path(workspace_id): Path<Uuid>,
    payload: Result<Json<CreateInvitation>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let payload = json_body(payload)?;
    let outcome = with_timeout(state.config.operation_timeout, async {
        state
            .invitations()
            .create_invitation(&auth, workspace_id, payload)
            .await
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "invitation": outcome.invitation,
            "warning": outcome.warning,
        })),
    ))
}

pub async fn resend_invitation(
    State(state): State<AppState>,
    session: AuthSession,
    Path((workspace_id, invite_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let outcome = with_timeout(state.config.operation_timeout, async {
        state
            .invitations()
            .resend_invitation(&auth, workspace_id, invite_id)
            .await
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "invitation": outcome.invitation,
        "warning": outcome.warning,
    })))
}

pub async fn cancel_invitation(
    State(state): State<AppState>,
    session: AuthSession,
    Path((workspace_id, invite_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let invitation = with_timeout(state.config.operation_timeout, async {
        state
            .invitations()
            .cancel_invitation(&auth, workspace_id, invite_id)
            .await
    })
    .await?;

    Ok(Json(json!({ "success": true, "invitation": invitation })))
}
