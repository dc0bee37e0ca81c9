use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::db::{user_repository::UserRepository, workspace_repository::WorkspaceRepository};
use crate::errors::AppError;
use crate::models::{
    audit::{AuditAction, NewAuditLog},
    billing::{normalize_plan_name, PlanLimitsTable},
    user::{MemberRole, MemberStatus, WorkspaceUser},
    workspace::{SubscriptionStatus, Workspace},
};
use crate::services::{
    access::{require_admin, require_member, require_owner},
    audit::AuditLogger,
    AuthContext,
};

pub struct MemberService {
    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub users: Arc<dyn UserRepository>,
    pub audit: AuditLogger,
    pub plans: Arc<PlanLimitsTable>,
}

impl MemberService {
    pub async fn list_members(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
    ) -> Result<Vec<WorkspaceUser>, AppError> {
        require_member(self.users.as_ref(), auth, workspace_id).await?;
        Ok(self.users.list_members(workspace_id, None).await?)
    }

    async fn target(&self, workspace_id: Uuid, user_id: Uuid) -> Result<WorkspaceUser, AppError> {
        match self.users.find_membership(workspace_id, user_id).await? {
            Some(member) if member.status != MemberStatus::Removed => Ok(member),
            _ => Err(AppError::NotFound("Member")),
        }
    }

    pub async fn update_member_role(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<WorkspaceUser, AppError> {
        let actor = require_admin(self.users.as_ref(), auth, workspace_id).await?;
        if role == MemberRole::Owner {
            return Err(AppError::validation("The owner role cannot be assigned"));
        }
        let target = self.target(workspace_id, user_id).await?;
        if target.role == MemberRole::Owner {
            return Err(AppError::forbidden("The workspace owner's role cannot be changed"));
        }

        let updated = self
            .users
            .update_member_role(workspace_id, user_id, role)
            .await?
            .ok_or(AppError::NotFound("Member"))?;

        info!(%workspace_id, %user_id, role = role.as_str(), "member role changed");
        self.audit
            .record(
                NewAuditLog::new(workspace_id, Some(actor.id), AuditAction::MemberRoleChanged)
                    .target(user_id)
                    .metadata(json!({ "from": target.role, "to": role })),
            )
            .await;
        Ok(updated)
    }

    /// `Removed` is the soft delete; rows are never physically deleted.
    pub async fn update_member_status(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
        user_id: Uuid,
        status: MemberStatus,
    ) -> Result<WorkspaceUser, AppError> {
        let actor = require_admin(self.users.as_ref(), auth, workspace_id).await?;
        let target = self.target(workspace_id, user_id).await?;
        if target.role == MemberRole::Owner && status != MemberStatus::Active {
            return Err(AppError::forbidden(
                "The workspace owner cannot be deactivated or removed",
            ));
        }

        let updated = self
            .users
            .update_member_status(workspace_id, user_id, status)
            .await?
            .ok_or(AppError::NotFound("Member"))?;

        info!(%workspace_id, %user_id, status = status.as_str(), "member status changed");
        self.audit
            .record(
                NewAuditLog::new(workspace_id, Some(actor.id), AuditAction::MemberStatusChanged)
                    .target(user_id)
                    .metadata(json!({ "from": target.status, "to": status })),
            )
            .await;
        Ok(updated)
    }

    pub async fn update_workspace_plan(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
        plan: &str,
        status: Option<SubscriptionStatus>,
    ) -> Result<Workspace, AppError> {
        let actor = require_owner(self.users.as_ref(), auth, workspace_id).await?;
        let plan = normalize_plan_name(plan);
        if !self.plans.contains(&plan) {
            return Err(AppError::validation(format!(
                "Unknown subscription plan '{plan}'"
            )));
        }
        let previous = self
            .workspaces
            .find_workspace(workspace_id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;

        let status = status.unwrap_or(SubscriptionStatus::Active);
        let updated = self
            .workspaces
            .update_workspace_plan(workspace_id, &plan, status)
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;

        info!(%workspace_id, plan = %plan, "workspace plan changed");
        self.audit
            .record(
                NewAuditLog::new(workspace_id, Some(actor.id), AuditAction::WorkspacePlanChanged)
                    .target(workspace_id)
                    .metadata(json!({
                        "from": previous.subscription_plan,
                        "to": plan,
                        "status": status,
                    })),
            )
            .await;
        Ok(updated)
    }
}
