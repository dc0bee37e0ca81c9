use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{auth::session::AuthSession, auth_context, json_body};
use crate::errors::AppError;
use crate::models::{
    user::{MemberRole, MemberStatus},
    workspace::SubscriptionStatus,
};
use crate::services::with_timeout;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RolePayload {
    pub role: MemberRole,
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: MemberStatus,
}

#[derive(Debug, Deserialize)]
pub struct PlanPayload {
    pub plan: String,
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,
}

/// Returns the caller's workspace, provisioning one on first sign-in.
pub async fn resolve_workspace(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let resolved = with_timeout(state.config.operation_timeout, async {
        state.resolver().resolve(&auth).await
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "workspace_id": resolved.workspace_id,
        "membership": resolved.membership,
        "created": resolved.created,
    })))
}

pub async fn list_members(
    State(state): State<AppState>,
    session: AuthSession,
    Path(workspace_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let members = with_timeout(state.config.operation_timeout, async {
        state.members().list_members(&auth, workspace_id).await
    })
    .await?;

    Ok(Json(json!({ "success": true, "members": members })))
}

pub async fn update_member_role(
    State(state): State<AppState>,
    session: AuthSession,
    Path((workspace_id, user_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<RolePayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let payload = json_body(payload)?;
    let member = with_timeout(state.config.operation_timeout, async {
        state
            .members()
            .update_member_role(&auth, workspace_id, user_id, payload.role)
            .await
    })
    .await?;

    Ok(Json(json!({ "success": true, "member": member })))
}

pub async fn update_member_status(
    State(state): State<AppState>,
    session: AuthSession,
    Path((workspace_id, user_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<StatusPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let payload = json_body(payload)?;
    let member = with_timeout(state.config.operation_timeout, async {
        state
            .members()
            .update_member_status(&auth, workspace_id, user_id, payload.status)
            .await
    })
    .await?;

    Ok(Json(json!({ "success": true, "member": member })))
}

pub async fn update_plan(
    State(state): State<AppState>,
    session: AuthSession,
    Path(workspace_id): Path<Uuid>,
    payload: Result<Json<PlanPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let auth = auth_context(&session)?;
    let payload = json_body(payload)?;
    let workspace = with_timeout(state.config.operation_timeout, async {
        state
            .members()
            .update_workspace_plan(&auth, workspace_id, &payload.plan, payload.status)
            .await
    })
    .await?;

    Ok(Json(json!({ "success": true, "workspace": workspace })))
}
