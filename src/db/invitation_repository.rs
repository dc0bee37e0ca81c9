use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::StoreResult;
use crate::models::{
    invitation::{Invitation, NewInvitation},
    user::{NewMembership, WorkspaceUser},
};

/// Everything the accept transition needs to commit as one unit.
#[derive(Debug, Clone)]
pub struct AcceptInvitation {
    pub invitation_id: Uuid,
    pub accepted_by: Uuid,
    pub accepted_at: OffsetDateTime,
    pub membership: NewMembership,
}

#[async_trait]
pub trait InvitationRepository: Send + Sync {
    /// Upsert on `(email, workspace_id)`. A row that is still pending keeps
    /// its token; a terminal row is reset to pending with the new token.
    async fn upsert_invitation(&self, invitation: &NewInvitation) -> StoreResult<Invitation>;

    async fn find_invitation(&self, invite_id: Uuid) -> StoreResult<Option<Invitation>>;

    /// The row for `(email, workspace_id)` in any status.
    async fn find_invitation_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Invitation>>;

    async fn find_pending_invitation_by_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<Invitation>>;

    async fn list_invitations(&self, workspace_id: Uuid) -> StoreResult<Vec<Invitation>>;

    /// Only applies while the row is pending.
    async fn refresh_invitation(
        &self,
        invite_id: Uuid,
        invited_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> StoreResult<Option<Invitation>>;

    /// Conditional `pending -> cancelled`.
    async fn cancel_invitation(&self, invite_id: Uuid) -> StoreResult<Option<Invitation>>;

    /// Conditional `pending -> expired`; returns whether a row transitioned.
    async fn mark_invitation_expired(&self, invite_id: Uuid) -> StoreResult<bool>;

    /// Conditional `pending -> accepted` (still unexpired at `accepted_at`)
    /// plus the membership upsert, committed atomically. `None` means the
    /// transition lost: the token was consumed, cancelled, or expired.
    async fn accept_invitation(
        &self,
        accept: &AcceptInvitation,
    ) -> StoreResult<Option<WorkspaceUser>>;
}
