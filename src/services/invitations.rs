use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{
    identity_repository::IdentityRepository,
    invitation_repository::{AcceptInvitation, InvitationRepository},
    user_repository::UserRepository,
    workspace_repository::WorkspaceRepository,
    StoreError,
};
use crate::errors::AppError;
use crate::models::{
    audit::{AuditAction, NewAuditLog},
    identity::{Identity, NewIdentity},
    invitation::{Invitation, InvitationPreview, InvitationStatus, InvitationView, NewInvitation},
    user::{MemberRole, MemberStatus, NewMembership, WorkspaceUser},
    workspace::Workspace,
};
use crate::services::{
    access::require_admin,
    audit::AuditLogger,
    identity::compensate_identity,
    smtp_mailer::Mailer,
    AuthContext,
};
use crate::utils::{
    password::{hash_password, verify_password},
    tokens::generate_invite_token,
    validation::{
        is_valid_email, normalize_email, trimmed_optional, validate_full_name, validate_password,
    },
};

pub const ACCEPT_REDIRECT: &str = "/dashboard";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvitation {
    pub email: String,
    pub role: MemberRole,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub custom_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvitationOutcome {
    pub invitation: InvitationView,
    /// Set when the row was saved but the email could not be delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptedInvitation {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub redirect_to: String,
}

pub struct InvitationService {
    pub workspaces: Arc<dyn WorkspaceRepository>,
    pub users: Arc<dyn UserRepository>,
    pub invitations: Arc<dyn InvitationRepository>,
    pub identities: Arc<dyn IdentityRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub audit: AuditLogger,
    pub frontend_origin: String,
    pub ttl: Duration,
}

impl InvitationService {
    pub fn invite_url(&self, token: &str) -> String {
        format!(
            "{}/accept-invite?token={}",
            self.frontend_origin.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    async fn load_workspace(&self, workspace_id: Uuid) -> Result<Workspace, AppError> {
        self.workspaces
            .find_workspace(workspace_id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))
    }

    async fn load_invitation(
        &self,
        workspace_id: Uuid,
        invite_id: Uuid,
    ) -> Result<Invitation, AppError> {
        match self.invitations.find_invitation(invite_id).await? {
            Some(invitation) if invitation.workspace_id == workspace_id => Ok(invitation),
            _ => Err(AppError::NotFound("Invitation")),
        }
    }

    /// Sends the invite email. Delivery failure is audited and handed back as
    /// a warning; the stored invitation stands either way.
    async fn deliver(
        &self,
        actor: &WorkspaceUser,
        workspace: &Workspace,
        invitation: &Invitation,
    ) -> Option<String> {
        let url = self.invite_url(&invitation.invite_token);
        let sent = self
            .mailer
            .send_invite_email(
                &invitation.email,
                &workspace.name,
                invitation.role.as_str(),
                &url,
            )
            .await;

        match sent {
            Ok(()) => None,
            Err(err) => {
                let failure = AppError::DownstreamSendFailure(err.to_string());
                warn!(
                    invitation_id = %invitation.id,
                    workspace_id = %workspace.id,
                    error = %err,
                    "invitation email failed"
                );
                self.audit
                    .record(
                        NewAuditLog::new(
                            workspace.id,
                            Some(actor.id),
                            AuditAction::InvitationEmailFailed,
                        )
                        .target(invitation.id)
                        .metadata(json!({ "email": invitation.email, "error": err.to_string() })),
                    )
                    .await;
                Some(failure.to_string())
            }
        }
    }

    pub async fn create_invitation(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
        request: CreateInvitation,
    ) -> Result<InvitationOutcome, AppError> {
        let actor = require_admin(self.users.as_ref(), auth, workspace_id).await?;

        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(AppError::validation("A valid email address is required"));
        }
        if request.role == MemberRole::Owner {
            return Err(AppError::validation(
                "The owner role cannot be assigned by invitation",
            ));
        }
        if let Some(existing) = self
            .users
            .find_workspace_member_by_email(workspace_id, &email)
            .await?
        {
            if existing.status == MemberStatus::Active {
                return Err(AppError::validation(format!(
                    "{email} is already a member of this workspace"
                )));
            }
            // Accepted is terminal while the membership it created exists.
            // Only a removed member can be invited into a new cycle.
            let previous = self
                .invitations
                .find_invitation_by_email(workspace_id, &email)
                .await?;
            if previous.is_some_and(|row| row.status == InvitationStatus::Accepted) {
                return Err(AppError::validation(format!(
                    "{email} has already accepted an invitation to this workspace"
                )));
            }
        }

        let workspace = self.load_workspace(workspace_id).await?;
        let now = OffsetDateTime::now_utc();
        let invitation = self
            .invitations
            .upsert_invitation(&NewInvitation {
                email: email.clone(),
                workspace_id,
                role: request.role,
                invited_by: actor.id,
                invited_by_name: Some(actor.full_name.clone()),
                invite_token: generate_invite_token(),
                custom_message: trimmed_optional(request.custom_message),
                department: trimmed_optional(request.department),
                invited_at: now,
                expires_at: now + self.ttl,
            })
            .await?;

        info!(
            invitation_id = %invitation.id,
            %workspace_id,
            role = invitation.role.as_str(),
            "invitation created"
        );
        self.audit
            .record(
                NewAuditLog::new(workspace_id, Some(actor.id), AuditAction::InvitationCreated)
                    .target(invitation.id)
                    .metadata(json!({
                        "email": invitation.email,
                        "role": invitation.role,
                        "expires_at": invitation.expires_at.unix_timestamp(),
                    })),
            )
            .await;

        let warning = self.deliver(&actor, &workspace, &invitation).await;
        Ok(InvitationOutcome {
            invitation: InvitationView::new(invitation, now),
            warning,
        })
    }

    /// Keeps the token and pushes the expiry out by a full TTL.
    pub async fn resend_invitation(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
        invite_id: Uuid,
    ) -> Result<InvitationOutcome, AppError> {
        let actor = require_admin(self.users.as_ref(), auth, workspace_id).await?;
        let current = self.load_invitation(workspace_id, invite_id).await?;
        if current.status != InvitationStatus::Pending {
            return Err(AppError::InvitationNotPending);
        }

        let workspace = self.load_workspace(workspace_id).await?;
        let now = OffsetDateTime::now_utc();
        let invitation = self
            .invitations
            .refresh_invitation(invite_id, now, now + self.ttl)
            .await?
            .ok_or(AppError::InvitationNotPending)?;

        info!(invitation_id = %invitation.id, %workspace_id, "invitation resent");
        self.audit
            .record(
                NewAuditLog::new(workspace_id, Some(actor.id), AuditAction::InvitationResent)
                    .target(invitation.id)
                    .metadata(json!({ "expires_at": invitation.expires_at.unix_timestamp() })),
            )
            .await;

        let warning = self.deliver(&actor, &workspace, &invitation).await;
        Ok(InvitationOutcome {
            invitation: InvitationView::new(invitation, now),
            warning,
        })
    }

    pub async fn cancel_invitation(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
        invite_id: Uuid,
    ) -> Result<InvitationView, AppError> {
        let actor = require_admin(self.users.as_ref(), auth, workspace_id).await?;
        self.load_invitation(workspace_id, invite_id).await?;

        let cancelled = self
            .invitations
            .cancel_invitation(invite_id)
            .await?
            .ok_or(AppError::InvitationNotPending)?;

        info!(invitation_id = %cancelled.id, %workspace_id, "invitation cancelled");
        self.audit
            .record(
                NewAuditLog::new(workspace_id, Some(actor.id), AuditAction::InvitationCancelled)
                    .target(cancelled.id)
                    .metadata(json!({ "email": cancelled.email })),
            )
            .await;

        Ok(InvitationView::new(cancelled, OffsetDateTime::now_utc()))
    }

    pub async fn list_invitations(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
    ) -> Result<Vec<InvitationView>, AppError> {
        require_admin(self.users.as_ref(), auth, workspace_id).await?;
        let now = OffsetDateTime::now_utc();
        Ok(self
            .invitations
            .list_invitations(workspace_id)
            .await?
            .into_iter()
            .map(|invitation| InvitationView::new(invitation, now))
            .collect())
    }

    pub async fn preview_invitation(&self, token: &str) -> Result<InvitationPreview, AppError> {
        let invitation = self
            .invitations
            .find_pending_invitation_by_token(token.trim())
            .await?
            .ok_or(AppError::InvalidOrExpiredInvitation)?;
        if !invitation.is_acceptable(OffsetDateTime::now_utc()) {
            return Err(AppError::InvalidOrExpiredInvitation);
        }
        let workspace = self.load_workspace(invitation.workspace_id).await?;

        Ok(InvitationPreview {
            email: invitation.email,
            workspace_id: workspace.id,
            workspace_name: workspace.name,
            role: invitation.role,
            invited_by_name: invitation.invited_by_name,
            custom_message: invitation.custom_message,
            expires_at: invitation.expires_at,
        })
    }

    /// Lazily retires an invitation found past its expiry.
    async fn expire(&self, invitation: &Invitation) {
        match self.invitations.mark_invitation_expired(invitation.id).await {
            Ok(true) => {
                info!(invitation_id = %invitation.id, "invitation expired");
                self.audit
                    .record(
                        NewAuditLog::new(
                            invitation.workspace_id,
                            None,
                            AuditAction::InvitationExpired,
                        )
                        .target(invitation.id),
                    )
                    .await;
            }
            Ok(false) => {}
            Err(err) => warn!(
                invitation_id = %invitation.id,
                error = %err,
                "failed to mark invitation expired"
            ),
        }
    }

    /// Decides whose membership the accept creates: the signed-in caller, an
    /// existing account proven by its password, or a new account.
    async fn resolve_acceptor(
        &self,
        invitation: &Invitation,
        request: &AcceptInvitationRequest,
        full_name: &str,
        session: Option<&AuthContext>,
    ) -> Result<Acceptor, AppError> {
        if let Some(session) = session {
            if normalize_email(&session.email) != invitation.email {
                return Err(AppError::validation(
                    "This invitation was sent to a different email address",
                ));
            }
            if let Some(identity) = self.identities.find_identity_by_id(session.identity_id).await? {
                return Ok(Acceptor::Existing(identity));
            }
        }

        if let Some(identity) = self.identities.find_identity_by_email(&invitation.email).await? {
            return match verify_password(&request.password, &identity.password_hash) {
                Ok(true) => {
                    self.identities.mark_identity_confirmed(identity.id).await?;
                    Ok(Acceptor::Existing(identity))
                }
                _ => Err(AppError::validation(
                    "An account already exists for this email. Enter its password to accept.",
                )),
            };
        }

        let password_hash = hash_password(&request.password)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;
        Ok(Acceptor::New(NewIdentity {
            email: invitation.email.clone(),
            password_hash,
            display_name: Some(full_name.to_string()),
            confirmed: true,
        }))
    }

    /// Redeems a token. The membership write and the `pending -> accepted`
    /// transition commit together; an identity created for this accept is
    /// deleted again if they do not.
    pub async fn accept_invitation(
        &self,
        request: AcceptInvitationRequest,
        session: Option<&AuthContext>,
    ) -> Result<AcceptedInvitation, AppError> {
        let token = request.token.trim();
        if token.is_empty() {
            return Err(AppError::validation("Invitation token is required"));
        }
        let full_name = validate_full_name(&request.full_name).map_err(AppError::Validation)?;
        validate_password(&request.password).map_err(AppError::Validation)?;

        let invitation = self
            .invitations
            .find_pending_invitation_by_token(token)
            .await?
            .ok_or(AppError::InvalidOrExpiredInvitation)?;

        let now = OffsetDateTime::now_utc();
        if !invitation.is_acceptable(now) {
            self.expire(&invitation).await;
            return Err(AppError::InvalidOrExpiredInvitation);
        }

        let acceptor = self
            .resolve_acceptor(&invitation, &request, &full_name, session)
            .await?;

        let commit = AcceptCommit {
            identities: self.identities.clone(),
            users: self.users.clone(),
            invitations: self.invitations.clone(),
            audit: self.audit.clone(),
            invitation,
            full_name,
            accepted_at: now,
        };
        // Detached so that dropping this future (timeout, client disconnect)
        // cannot skip compensation or the audit entry.
        let member = tokio::spawn(commit.run(acceptor))
            .await
            .map_err(|e| AppError::Internal(format!("accept task failed: {e}")))??;

        Ok(AcceptedInvitation {
            workspace_id: member.workspace_id,
            user_id: member.id,
            role: member.role,
            redirect_to: ACCEPT_REDIRECT.to_string(),
        })
    }
}

enum Acceptor {
    Existing(Identity),
    New(NewIdentity),
}

/// The store-writing tail of an accept: identity creation, the atomic
/// `pending -> accepted` + membership commit, compensation, and the audit
/// entry. Owns its collaborators so it can run as its own task.
struct AcceptCommit {
    identities: Arc<dyn IdentityRepository>,
    users: Arc<dyn UserRepository>,
    invitations: Arc<dyn InvitationRepository>,
    audit: AuditLogger,
    invitation: Invitation,
    full_name: String,
    accepted_at: OffsetDateTime,
}

impl AcceptCommit {
    async fn run(self, acceptor: Acceptor) -> Result<WorkspaceUser, AppError> {
        let (identity, created) = match acceptor {
            Acceptor::Existing(identity) => (identity, false),
            Acceptor::New(new_identity) => {
                match self.identities.create_identity(&new_identity).await {
                    Ok(identity) => (identity, true),
                    // A concurrent accept of the same token created the account first.
                    Err(StoreError::Conflict(_)) => {
                        info!(
                            invitation_id = %self.invitation.id,
                            "identity already created by a concurrent accept"
                        );
                        return Err(AppError::InvalidOrExpiredInvitation);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        let accepted = self
            .invitations
            .accept_invitation(&AcceptInvitation {
                invitation_id: self.invitation.id,
                accepted_by: identity.id,
                accepted_at: self.accepted_at,
                membership: NewMembership {
                    id: identity.id,
                    workspace_id: self.invitation.workspace_id,
                    email: self.invitation.email.clone(),
                    full_name: self.full_name.clone(),
                    role: self.invitation.role,
                    status: MemberStatus::Active,
                    department: self.invitation.department.clone(),
                },
            })
            .await;

        match accepted {
            Ok(Some(member)) => {
                info!(
                    invitation_id = %self.invitation.id,
                    workspace_id = %member.workspace_id,
                    user_id = %member.id,
                    "invitation accepted"
                );
                self.audit
                    .record(
                        NewAuditLog::new(
                            member.workspace_id,
                            Some(identity.id),
                            AuditAction::InvitationAccepted,
                        )
                        .target(self.invitation.id)
                        .metadata(json!({
                            "email": self.invitation.email,
                            "role": member.role,
                            "new_identity": created,
                        })),
                    )
                    .await;
                Ok(member)
            }
            Ok(None) => {
                if created {
                    self.compensate(&identity).await;
                }
                Err(AppError::InvalidOrExpiredInvitation)
            }
            Err(err) => {
                warn!(
                    invitation_id = %self.invitation.id,
                    error = %err,
                    "accept transaction failed"
                );
                if created {
                    self.compensate(&identity).await;
                }
                Err(err.into())
            }
        }
    }

    /// An identity that a concurrent accept already attached a membership to
    /// is kept.
    async fn compensate(&self, identity: &Identity) {
        if let Ok(Some(member)) = self.users.find_membership_by_identity(identity.id).await {
            warn!(
                identity_id = %identity.id,
                workspace_id = %member.workspace_id,
                "identity already holds a membership; not removing it"
            );
            return;
        }
        compensate_identity(self.identities.as_ref(), identity).await;
    }
}
