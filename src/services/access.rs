use uuid::Uuid;

use crate::db::user_repository::UserRepository;
use crate::errors::AppError;
use crate::models::user::{MemberRole, MemberStatus, WorkspaceUser};
use crate::services::AuthContext;

/// Active, non-removed membership of the caller in `workspace_id`.
pub async fn require_member(
    users: &dyn UserRepository,
    auth: &AuthContext,
    workspace_id: Uuid,
) -> Result<WorkspaceUser, AppError> {
    match users.find_membership(workspace_id, auth.identity_id).await? {
        Some(member) if member.status == MemberStatus::Active => Ok(member),
        _ => Err(AppError::forbidden("You do not have access to this workspace")),
    }
}

pub async fn require_admin(
    users: &dyn UserRepository,
    auth: &AuthContext,
    workspace_id: Uuid,
) -> Result<WorkspaceUser, AppError> {
    let member = require_member(users, auth, workspace_id).await?;
    if !member.role.is_admin_or_owner() {
        return Err(AppError::forbidden(
            "Only workspace owners and admins can perform this action",
        ));
    }
    Ok(member)
}

pub async fn require_owner(
    users: &dyn UserRepository,
    auth: &AuthContext,
    workspace_id: Uuid,
) -> Result<WorkspaceUser, AppError> {
    let member = require_member(users, auth, workspace_id).await?;
    if member.role != MemberRole::Owner {
        return Err(AppError::forbidden(
            "Only the workspace owner can perform this action",
        ));
    }
    Ok(member)
}
