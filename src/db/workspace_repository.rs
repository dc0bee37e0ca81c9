use async_trait::async_trait;
use uuid::Uuid;

use super::StoreResult;
use crate::models::workspace::{NewWorkspace, ProvisionedWorkspace, SubscriptionStatus, Workspace};

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Inserts the workspace or returns the one already owned by
    /// `new.owner_id`. Two concurrent callers for the same owner converge on
    /// a single row.
    async fn provision_owned_workspace(
        &self,
        new: &NewWorkspace,
    ) -> StoreResult<ProvisionedWorkspace>;

    async fn find_workspace(&self, workspace_id: Uuid) -> StoreResult<Option<Workspace>>;

    async fn update_workspace_plan(
        &self,
        workspace_id: Uuid,
        plan: &str,
        status: SubscriptionStatus,
    ) -> StoreResult<Option<Workspace>>;
}
