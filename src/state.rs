use std::sync::Arc;

use crate::config::Config;
use crate::db::{
    activity_repository::ActivityRepository, audit_log_repository::AuditLogRepository,
    identity_repository::IdentityRepository, invitation_repository::InvitationRepository,
    user_repository::UserRepository, workspace_repository::WorkspaceRepository,
};
use crate::services::{
    activity::ActivityTracker, audit::AuditLogger, billing::BillingCalculator,
    invitations::InvitationService, members::MemberService, resolver::WorkspaceResolver,
    smtp_mailer::Mailer,
};
use crate::utils::jwt::{JwtKeyProvider, JwtKeys};

#[derive(Clone)]
pub struct AppState {
    pub workspace_repo: Arc<dyn WorkspaceRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub invitation_repo: Arc<dyn InvitationRepository>,
    pub identity_repo: Arc<dyn IdentityRepository>,
    pub activity_repo: Arc<dyn ActivityRepository>,
    pub audit_repo: Arc<dyn AuditLogRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
    pub jwt_keys: Arc<JwtKeys>,
}

impl AppState {
    pub fn audit_logger(&self) -> AuditLogger {
        AuditLogger::new(self.audit_repo.clone())
    }

    pub fn resolver(&self) -> WorkspaceResolver {
        WorkspaceResolver::new(
            self.workspace_repo.clone(),
            self.user_repo.clone(),
            self.audit_logger(),
        )
    }

    pub fn billing(&self) -> BillingCalculator {
        BillingCalculator::new(
            self.workspace_repo.clone(),
            self.user_repo.clone(),
            self.activity_repo.clone(),
            Arc::new(self.config.plan_limits.clone()),
        )
    }

    pub fn invitations(&self) -> InvitationService {
        InvitationService {
            workspaces: self.workspace_repo.clone(),
            users: self.user_repo.clone(),
            invitations: self.invitation_repo.clone(),
            identities: self.identity_repo.clone(),
            mailer: self.mailer.clone(),
            audit: self.audit_logger(),
            frontend_origin: self.config.frontend_origin.clone(),
            ttl: self.config.invitation_ttl,
        }
    }

    pub fn members(&self) -> MemberService {
        MemberService {
            workspaces: self.workspace_repo.clone(),
            users: self.user_repo.clone(),
            audit: self.audit_logger(),
            plans: Arc::new(self.config.plan_limits.clone()),
        }
    }

    pub fn activity(&self) -> ActivityTracker {
        ActivityTracker::new(self.activity_repo.clone(), self.user_repo.clone())
    }
}

impl JwtKeyProvider for AppState {
    fn jwt_keys(&self) -> &JwtKeys {
        self.jwt_keys.as_ref()
    }

    fn jwt_issuer(&self) -> &str {
        &self.config.jwt_issuer
    }

    fn jwt_audience(&self) -> &str {
        &self.config.jwt_audience
    }
}
