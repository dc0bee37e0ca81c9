use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::{auth::session::AuthSession, json_body};
use crate::errors::AppError;
use crate::services::{invitations::AcceptInvitationRequest, with_timeout};
use crate::state::AppState;

/// `POST /api/accept-invite`. Works for anonymous callers (a new account is
/// created) and for a signed-in identity whose email matches the invitation.
pub async fn accept_invite(
    State(state): State<AppState>,
    session: Option<AuthSession>,
    payload: Result<Json<AcceptInvitationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let request = json_body(payload)?;
    let caller = session.as_ref().and_then(|s| s.context().ok());

    let accepted = with_timeout(state.config.operation_timeout, async {
        state
            .invitations()
            .accept_invitation(request, caller.as_ref())
            .await
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "workspace_id": accepted.workspace_id,
        "user_id": accepted.user_id,
        "role": accepted.role,
        "redirect_to": accepted.redirect_to,
    })))
}

pub async fn preview_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let preview = with_timeout(state.config.operation_timeout, async {
        state.invitations().preview_invitation(&token).await
    })
    .await?;

    Ok(Json(json!({ "success": true, "invitation": preview })))
}
