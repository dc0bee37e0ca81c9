use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{user_repository::UserRepository, workspace_repository::WorkspaceRepository};
use crate::errors::AppError;
use crate::models::{
    audit::{AuditAction, NewAuditLog},
    user::{MemberRole, MemberStatus, NewMembership, WorkspaceUser},
    workspace::{
        default_workspace_name, NewWorkspace, DEFAULT_WORKSPACE_MAX_USERS, WORKSPACE_PLAN_FREE,
    },
};
use crate::services::{audit::AuditLogger, AuthContext};
use crate::utils::validation::normalize_email;

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedWorkspace {
    pub workspace_id: Uuid,
    pub membership: WorkspaceUser,
    /// True only for the call whose upsert inserted the workspace row.
    pub created: bool,
}

pub struct WorkspaceResolver {
    workspaces: Arc<dyn WorkspaceRepository>,
    users: Arc<dyn UserRepository>,
    audit: AuditLogger,
}

impl WorkspaceResolver {
    pub fn new(
        workspaces: Arc<dyn WorkspaceRepository>,
        users: Arc<dyn UserRepository>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            workspaces,
            users,
            audit,
        }
    }

    /// Returns the caller's workspace, provisioning a personal one on first
    /// use. Concurrent first calls for the same identity converge on the same
    /// workspace through the owner-keyed upsert.
    pub async fn resolve(&self, auth: &AuthContext) -> Result<ResolvedWorkspace, AppError> {
        let email = normalize_email(&auth.email);

        if let Some(membership) = self
            .users
            .find_membership_by_identity(auth.identity_id)
            .await
            .map_err(|e| provisioning_failure(auth, e))?
        {
            return Ok(ResolvedWorkspace {
                workspace_id: membership.workspace_id,
                membership,
                created: false,
            });
        }

        // Identity ids can drift (re-created accounts); the email still
        // points at the right membership.
        if let Some(membership) = self
            .users
            .find_membership_by_email(&email)
            .await
            .map_err(|e| provisioning_failure(auth, e))?
        {
            return Ok(ResolvedWorkspace {
                workspace_id: membership.workspace_id,
                membership,
                created: false,
            });
        }

        let provisioned = self
            .workspaces
            .provision_owned_workspace(&NewWorkspace {
                name: default_workspace_name(&email),
                owner_id: auth.identity_id,
                subscription_plan: WORKSPACE_PLAN_FREE.to_string(),
                max_users: DEFAULT_WORKSPACE_MAX_USERS,
            })
            .await
            .map_err(|e| provisioning_failure(auth, e))?;
        let workspace = provisioned.workspace;

        if provisioned.created {
            info!(
                workspace_id = %workspace.id,
                owner_id = %auth.identity_id,
                "provisioned workspace"
            );
            let entry = NewAuditLog::new(
                workspace.id,
                Some(auth.identity_id),
                AuditAction::WorkspaceProvisioned,
            )
            .target(workspace.id)
            .metadata(json!({
                "name": workspace.name,
                "subscription_plan": workspace.subscription_plan,
            }));
            self.audit.record(entry).await;
        }

        let full_name = auth
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        let membership = self
            .users
            .upsert_membership(&NewMembership {
                id: auth.identity_id,
                workspace_id: workspace.id,
                email: email.clone(),
                full_name,
                role: MemberRole::Owner,
                status: MemberStatus::Active,
                department: None,
            })
            .await
            .map_err(|e| provisioning_failure(auth, e))?;

        Ok(ResolvedWorkspace {
            workspace_id: workspace.id,
            membership,
            created: provisioned.created,
        })
    }
}

fn provisioning_failure(auth: &AuthContext, err: crate::db::StoreError) -> AppError {
    error!(identity_id = %auth.identity_id, error = %err, "workspace resolution failed");
    AppError::Provisioning(err)
}
