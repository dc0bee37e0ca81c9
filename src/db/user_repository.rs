use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::StoreResult;
use crate::models::user::{MemberRole, MemberStatus, NewMembership, WorkspaceUser};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Oldest non-removed membership for the identity.
    async fn find_membership_by_identity(
        &self,
        identity_id: Uuid,
    ) -> StoreResult<Option<WorkspaceUser>>;

    /// Oldest non-removed membership registered under the email.
    async fn find_membership_by_email(&self, email: &str) -> StoreResult<Option<WorkspaceUser>>;

    async fn find_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<WorkspaceUser>>;

    async fn find_workspace_member_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<WorkspaceUser>>;

    /// Upsert on `(id, workspace_id)`.
    async fn upsert_membership(&self, membership: &NewMembership) -> StoreResult<WorkspaceUser>;

    /// `None` lists every non-removed member.
    async fn list_members(
        &self,
        workspace_id: Uuid,
        status: Option<MemberStatus>,
    ) -> StoreResult<Vec<WorkspaceUser>>;

    async fn update_member_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> StoreResult<Option<WorkspaceUser>>;

    async fn update_member_status(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        status: MemberStatus,
    ) -> StoreResult<Option<WorkspaceUser>>;

    async fn touch_last_active(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<()>;
}
