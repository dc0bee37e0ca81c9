use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    activity_repository::ActivityRepository,
    audit_log_repository::AuditLogRepository,
    identity_repository::IdentityRepository,
    invitation_repository::{AcceptInvitation, InvitationRepository},
    user_repository::UserRepository,
    workspace_repository::WorkspaceRepository,
    StoreError, StoreResult,
};
use crate::models::{
    activity::ActivityRecord,
    audit::{AuditLog, NewAuditLog},
    identity::{Identity, NewIdentity},
    invitation::{Invitation, InvitationStatus, NewInvitation},
    user::{MemberRole, MemberStatus, NewMembership, WorkspaceUser},
    workspace::{NewWorkspace, ProvisionedWorkspace, SubscriptionStatus, Workspace},
};

#[derive(Default)]
struct State {
    workspaces: Vec<Workspace>,
    users: Vec<WorkspaceUser>,
    invitations: Vec<Invitation>,
    identities: Vec<Identity>,
    activity: Vec<ActivityRecord>,
    audit_logs: Vec<AuditLog>,
}

/// In-memory store implementing every repository trait. Mirrors the
/// conditional-update semantics of the Postgres queries so service tests can
/// exercise races and failure paths without a database.
#[derive(Default)]
pub struct InMemoryDb {
    state: Mutex<State>,
    pub unavailable: AtomicBool,
    pub fail_accept: AtomicBool,
    pub fail_create_identity: AtomicBool,
    /// Simulates a concurrent request inserting the same email first.
    pub race_create_identity: AtomicBool,
    pub fail_audit: AtomicBool,
    pub fail_membership_upsert: AtomicBool,
}

fn unavailable() -> StoreError {
    StoreError::Unavailable("mock store offline".into())
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }

    pub fn seed_workspace(&self, owner_id: Uuid, name: &str, plan: &str) -> Workspace {
        let now = OffsetDateTime::now_utc();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner_id,
            subscription_plan: plan.to_string(),
            subscription_status: SubscriptionStatus::Active,
            max_users: 5,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().workspaces.push(workspace.clone());
        workspace
    }

    pub fn seed_member(
        &self,
        workspace_id: Uuid,
        email: &str,
        role: MemberRole,
        status: MemberStatus,
    ) -> WorkspaceUser {
        let member = WorkspaceUser {
            id: Uuid::new_v4(),
            workspace_id,
            email: email.to_string(),
            full_name: email.split('@').next().unwrap_or_default().to_string(),
            role,
            status,
            department: None,
            created_at: OffsetDateTime::now_utc(),
            last_active: None,
        };
        self.state.lock().unwrap().users.push(member.clone());
        member
    }

    pub fn seed_identity(&self, email: &str, password_hash: &str) -> Identity {
        let identity = Identity {
            id: Uuid::new_v4(),
            email: email.to_lowercase(),
            password_hash: password_hash.to_string(),
            display_name: None,
            confirmed_at: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().identities.push(identity.clone());
        identity
    }

    pub fn seed_activity(&self, workspace_id: Uuid, user_id: Uuid, at: OffsetDateTime) {
        self.state.lock().unwrap().activity.push(ActivityRecord {
            id: Uuid::new_v4(),
            workspace_id,
            user_id,
            event_type: "meeting.joined".into(),
            occurred_at: at,
        });
    }

    /// Overwrites a stored invitation, e.g. to move its expiry into the past.
    pub fn put_invitation(&self, invitation: Invitation) {
        let mut state = self.state.lock().unwrap();
        state.invitations.retain(|row| row.id != invitation.id);
        state.invitations.push(invitation);
    }

    pub fn workspaces(&self) -> Vec<Workspace> {
        self.state.lock().unwrap().workspaces.clone()
    }

    pub fn members(&self) -> Vec<WorkspaceUser> {
        self.state.lock().unwrap().users.clone()
    }

    pub fn invitations(&self) -> Vec<Invitation> {
        self.state.lock().unwrap().invitations.clone()
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.state.lock().unwrap().identities.clone()
    }

    pub fn audit_actions(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .audit_logs
            .iter()
            .map(|log| log.action.clone())
            .collect()
    }

    fn upsert_member_locked(state: &mut State, membership: &NewMembership) -> WorkspaceUser {
        if let Some(existing) = state
            .users
            .iter_mut()
            .find(|u| u.id == membership.id && u.workspace_id == membership.workspace_id)
        {
            existing.email = membership.email.clone();
            existing.full_name = membership.full_name.clone();
            existing.role = membership.role;
            existing.status = membership.status;
            if membership.department.is_some() {
                existing.department = membership.department.clone();
            }
            return existing.clone();
        }
        let member = WorkspaceUser {
            id: membership.id,
            workspace_id: membership.workspace_id,
            email: membership.email.clone(),
            full_name: membership.full_name.clone(),
            role: membership.role,
            status: membership.status,
            department: membership.department.clone(),
            created_at: OffsetDateTime::now_utc(),
            last_active: None,
        };
        state.users.push(member.clone());
        member
    }
}

#[async_trait]
impl WorkspaceRepository for InMemoryDb {
    async fn provision_owned_workspace(
        &self,
        new: &NewWorkspace,
    ) -> StoreResult<ProvisionedWorkspace> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.workspaces.iter().find(|w| w.owner_id == new.owner_id) {
            return Ok(ProvisionedWorkspace {
                workspace: existing.clone(),
                created: false,
            });
        }
        let now = OffsetDateTime::now_utc();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            owner_id: new.owner_id,
            subscription_plan: new.subscription_plan.clone(),
            subscription_status: SubscriptionStatus::Active,
            max_users: new.max_users,
            created_at: now,
            updated_at: now,
        };
        state.workspaces.push(workspace.clone());
        Ok(ProvisionedWorkspace {
            workspace,
            created: true,
        })
    }

    async fn find_workspace(&self, workspace_id: Uuid) -> StoreResult<Option<Workspace>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.workspaces.iter().find(|w| w.id == workspace_id).cloned())
    }

    async fn update_workspace_plan(
        &self,
        workspace_id: Uuid,
        plan: &str,
        status: SubscriptionStatus,
    ) -> StoreResult<Option<Workspace>> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        Ok(state
            .workspaces
            .iter_mut()
            .find(|w| w.id == workspace_id)
            .map(|w| {
                w.subscription_plan = plan.to_string();
                w.subscription_status = status;
                w.updated_at = OffsetDateTime::now_utc();
                w.clone()
            }))
    }
}

#[async_trait]
impl UserRepository for InMemoryDb {
    async fn find_membership_by_identity(
        &self,
        identity_id: Uuid,
    ) -> StoreResult<Option<WorkspaceUser>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .filter(|u| u.id == identity_id && u.status != MemberStatus::Removed)
            .min_by_key(|u| u.created_at)
            .cloned())
    }

    async fn find_membership_by_email(&self, email: &str) -> StoreResult<Option<WorkspaceUser>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .filter(|u| u.email.eq_ignore_ascii_case(email) && u.status != MemberStatus::Removed)
            .min_by_key(|u| u.created_at)
            .cloned())
    }

    async fn find_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<WorkspaceUser>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| u.workspace_id == workspace_id && u.id == user_id)
            .cloned())
    }

    async fn find_workspace_member_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<WorkspaceUser>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .find(|u| {
                u.workspace_id == workspace_id
                    && u.email.eq_ignore_ascii_case(email)
                    && u.status != MemberStatus::Removed
            })
            .cloned())
    }

    async fn upsert_membership(&self, membership: &NewMembership) -> StoreResult<WorkspaceUser> {
        self.check()?;
        if self.fail_membership_upsert.load(Ordering::SeqCst) {
            return Err(StoreError::Other("membership upsert rejected".into()));
        }
        let mut state = self.state.lock().unwrap();
        Ok(Self::upsert_member_locked(&mut state, membership))
    }

    async fn list_members(
        &self,
        workspace_id: Uuid,
        status: Option<MemberStatus>,
    ) -> StoreResult<Vec<WorkspaceUser>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .filter(|u| u.workspace_id == workspace_id)
            .filter(|u| match status {
                Some(wanted) => u.status == wanted,
                None => u.status != MemberStatus::Removed,
            })
            .cloned()
            .collect())
    }

    async fn update_member_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> StoreResult<Option<WorkspaceUser>> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter_mut()
            .find(|u| u.workspace_id == workspace_id && u.id == user_id)
            .map(|u| {
                u.role = role;
                u.clone()
            }))
    }

    async fn update_member_status(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        status: MemberStatus,
    ) -> StoreResult<Option<WorkspaceUser>> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter_mut()
            .find(|u| u.workspace_id == workspace_id && u.id == user_id)
            .map(|u| {
                u.status = status;
                u.clone()
            }))
    }

    async fn touch_last_active(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if let Some(member) = state
            .users
            .iter_mut()
            .find(|u| u.workspace_id == workspace_id && u.id == user_id)
        {
            member.last_active = Some(member.last_active.map_or(at, |prev| prev.max(at)));
        }
        Ok(())
    }
}

#[async_trait]
impl InvitationRepository for InMemoryDb {
    async fn upsert_invitation(&self, invitation: &NewInvitation) -> StoreResult<Invitation> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.invitations.iter_mut().find(|row| {
            row.workspace_id == invitation.workspace_id && row.email == invitation.email
        }) {
            if existing.status != InvitationStatus::Pending {
                existing.invite_token = invitation.invite_token.clone();
            }
            existing.role = invitation.role;
            existing.invited_by = invitation.invited_by;
            existing.invited_by_name = invitation.invited_by_name.clone();
            existing.status = InvitationStatus::Pending;
            existing.custom_message = invitation.custom_message.clone();
            existing.department = invitation.department.clone();
            existing.invited_at = invitation.invited_at;
            existing.expires_at = invitation.expires_at;
            existing.accepted_at = None;
            existing.accepted_by = None;
            return Ok(existing.clone());
        }
        if state
            .invitations
            .iter()
            .any(|row| row.invite_token == invitation.invite_token)
        {
            return Err(StoreError::Conflict("duplicate invite token".into()));
        }
        let row = Invitation {
            id: Uuid::new_v4(),
            email: invitation.email.clone(),
            workspace_id: invitation.workspace_id,
            role: invitation.role,
            invited_by: invitation.invited_by,
            invited_by_name: invitation.invited_by_name.clone(),
            invite_token: invitation.invite_token.clone(),
            status: InvitationStatus::Pending,
            custom_message: invitation.custom_message.clone(),
            department: invitation.department.clone(),
            created_at: invitation.invited_at,
            invited_at: invitation.invited_at,
            expires_at: invitation.expires_at,
            accepted_at: None,
            accepted_by: None,
        };
        state.invitations.push(row.clone());
        Ok(row)
    }

    async fn find_invitation(&self, invite_id: Uuid) -> StoreResult<Option<Invitation>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.invitations.iter().find(|row| row.id == invite_id).cloned())
    }

    async fn find_invitation_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Invitation>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .invitations
            .iter()
            .find(|row| row.workspace_id == workspace_id && row.email == email)
            .cloned())
    }

    async fn find_pending_invitation_by_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<Invitation>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .invitations
            .iter()
            .find(|row| row.invite_token == token && row.status == InvitationStatus::Pending)
            .cloned())
    }

    async fn list_invitations(&self, workspace_id: Uuid) -> StoreResult<Vec<Invitation>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<Invitation> = state
            .invitations
            .iter()
            .filter(|row| row.workspace_id == workspace_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.invited_at.cmp(&a.invited_at));
        Ok(rows)
    }

    async fn refresh_invitation(
        &self,
        invite_id: Uuid,
        invited_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> StoreResult<Option<Invitation>> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        Ok(state
            .invitations
            .iter_mut()
            .find(|row| row.id == invite_id && row.status == InvitationStatus::Pending)
            .map(|row| {
                row.invited_at = invited_at;
                row.expires_at = expires_at;
                row.clone()
            }))
    }

    async fn cancel_invitation(&self, invite_id: Uuid) -> StoreResult<Option<Invitation>> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        Ok(state
            .invitations
            .iter_mut()
            .find(|row| row.id == invite_id && row.status == InvitationStatus::Pending)
            .map(|row| {
                row.status = InvitationStatus::Cancelled;
                row.clone()
            }))
    }

    async fn mark_invitation_expired(&self, invite_id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        match state
            .invitations
            .iter_mut()
            .find(|row| row.id == invite_id && row.status == InvitationStatus::Pending)
        {
            Some(row) => {
                row.status = InvitationStatus::Expired;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn accept_invitation(
        &self,
        accept: &AcceptInvitation,
    ) -> StoreResult<Option<WorkspaceUser>> {
        self.check()?;
        if self.fail_accept.load(Ordering::SeqCst) {
            return Err(StoreError::Other("transaction aborted".into()));
        }
        let mut state = self.state.lock().unwrap();
        let Some(row) = state.invitations.iter_mut().find(|row| {
            row.id == accept.invitation_id
                && row.status == InvitationStatus::Pending
                && row.expires_at > accept.accepted_at
        }) else {
            return Ok(None);
        };
        row.status = InvitationStatus::Accepted;
        row.accepted_at = Some(accept.accepted_at);
        row.accepted_by = Some(accept.accepted_by);
        Ok(Some(Self::upsert_member_locked(&mut state, &accept.membership)))
    }
}

#[async_trait]
impl IdentityRepository for InMemoryDb {
    async fn find_identity_by_id(&self, identity_id: Uuid) -> StoreResult<Option<Identity>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state.identities.iter().find(|i| i.id == identity_id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .identities
            .iter()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_identity(&self, identity: &NewIdentity) -> StoreResult<Identity> {
        self.check()?;
        if self.fail_create_identity.load(Ordering::SeqCst) {
            return Err(StoreError::Other("identity insert rejected".into()));
        }
        let mut state = self.state.lock().unwrap();
        if self.race_create_identity.load(Ordering::SeqCst) {
            let now = OffsetDateTime::now_utc();
            state.identities.push(Identity {
                id: Uuid::new_v4(),
                email: identity.email.to_lowercase(),
                password_hash: identity.password_hash.clone(),
                display_name: None,
                confirmed_at: Some(now),
                created_at: now,
            });
        }
        if state
            .identities
            .iter()
            .any(|i| i.email.eq_ignore_ascii_case(&identity.email))
        {
            return Err(StoreError::Conflict("identities_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let created = Identity {
            id: Uuid::new_v4(),
            email: identity.email.to_lowercase(),
            password_hash: identity.password_hash.clone(),
            display_name: identity.display_name.clone(),
            confirmed_at: identity.confirmed.then_some(now),
            created_at: now,
        };
        state.identities.push(created.clone());
        Ok(created)
    }

    async fn mark_identity_confirmed(&self, identity_id: Uuid) -> StoreResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if let Some(identity) = state.identities.iter_mut().find(|i| i.id == identity_id) {
            identity.confirmed_at.get_or_insert_with(OffsetDateTime::now_utc);
        }
        Ok(())
    }

    async fn delete_identity(&self, identity_id: Uuid) -> StoreResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.identities.retain(|i| i.id != identity_id);
        Ok(())
    }
}

#[async_trait]
impl ActivityRepository for InMemoryDb {
    async fn record_activity(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        event_type: &str,
        at: OffsetDateTime,
    ) -> StoreResult<ActivityRecord> {
        self.check()?;
        let record = ActivityRecord {
            id: Uuid::new_v4(),
            workspace_id,
            user_id,
            event_type: event_type.to_string(),
            occurred_at: at,
        };
        self.state.lock().unwrap().activity.push(record.clone());
        Ok(record)
    }

    async fn list_active_user_ids(
        &self,
        workspace_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> StoreResult<Vec<Uuid>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let mut ids: Vec<Uuid> = state
            .activity
            .iter()
            .filter(|a| a.workspace_id == workspace_id && a.occurred_at >= since && a.occurred_at < until)
            .map(|a| a.user_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryDb {
    async fn insert_audit_log(&self, entry: &NewAuditLog) -> StoreResult<AuditLog> {
        self.check()?;
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("audit sink offline".into()));
        }
        let log = AuditLog {
            id: Uuid::new_v4(),
            workspace_id: entry.workspace_id,
            actor_id: entry.actor_id,
            action: entry.action.as_str().to_string(),
            target_type: entry.action.target_type().to_string(),
            target_id: entry.target_id,
            metadata: if entry.metadata.is_null() {
                Value::Object(Default::default())
            } else {
                entry.metadata.clone()
            },
            created_at: OffsetDateTime::now_utc(),
        };
        self.state.lock().unwrap().audit_logs.push(log.clone());
        Ok(log)
    }

    async fn list_audit_logs(&self, workspace_id: Uuid, limit: i64) -> StoreResult<Vec<AuditLog>> {
        self.check()?;
        let state = self.state.lock().unwrap();
        Ok(state
            .audit_logs
            .iter()
            .rev()
            .filter(|log| log.workspace_id == workspace_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
