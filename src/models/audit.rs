use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "workspace.provisioned")]
    WorkspaceProvisioned,
    #[serde(rename = "workspace.plan_changed")]
    WorkspacePlanChanged,
    #[serde(rename = "member.role_changed")]
    MemberRoleChanged,
    #[serde(rename = "member.status_changed")]
    MemberStatusChanged,
    #[serde(rename = "invitation.created")]
    InvitationCreated,
    #[serde(rename = "invitation.resent")]
    InvitationResent,
    #[serde(rename = "invitation.cancelled")]
    InvitationCancelled,
    #[serde(rename = "invitation.accepted")]
    InvitationAccepted,
    #[serde(rename = "invitation.expired")]
    InvitationExpired,
    #[serde(rename = "invitation.email_failed")]
    InvitationEmailFailed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::WorkspaceProvisioned => "workspace.provisioned",
            AuditAction::WorkspacePlanChanged => "workspace.plan_changed",
            AuditAction::MemberRoleChanged => "member.role_changed",
            AuditAction::MemberStatusChanged => "member.status_changed",
            AuditAction::InvitationCreated => "invitation.created",
            AuditAction::InvitationResent => "invitation.resent",
            AuditAction::InvitationCancelled => "invitation.cancelled",
            AuditAction::InvitationAccepted => "invitation.accepted",
            AuditAction::InvitationExpired => "invitation.expired",
            AuditAction::InvitationEmailFailed => "invitation.email_failed",
        }
    }

    pub fn target_type(&self) -> &'static str {
        match self {
            AuditAction::WorkspaceProvisioned | AuditAction::WorkspacePlanChanged => "workspace",
            AuditAction::MemberRoleChanged | AuditAction::MemberStatusChanged => "user",
            _ => "invitation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<Uuid>,
    pub metadata: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub workspace_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub target_id: Option<Uuid>,
    pub metadata: Value,
}

impl NewAuditLog {
    pub fn new(workspace_id: Uuid, actor_id: Option<Uuid>, action: AuditAction) -> Self {
        Self {
            workspace_id,
            actor_id,
            action,
            target_id: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn target(mut self, target_id: Uuid) -> Self {
        self.target_id = Some(target_id);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
