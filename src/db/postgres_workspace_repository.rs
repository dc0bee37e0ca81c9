use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{workspace_repository::WorkspaceRepository, StoreResult};
use crate::models::workspace::{NewWorkspace, ProvisionedWorkspace, SubscriptionStatus, Workspace};

pub struct PostgresWorkspaceRepository {
    pub pool: PgPool,
}

#[derive(FromRow)]
struct ProvisionedRow {
    #[sqlx(flatten)]
    workspace: Workspace,
    inserted: bool,
}

#[async_trait]
impl WorkspaceRepository for PostgresWorkspaceRepository {
    async fn provision_owned_workspace(
        &self,
        new: &NewWorkspace,
    ) -> StoreResult<ProvisionedWorkspace> {
        // The no-op update makes RETURNING yield the existing row on conflict;
        // xmax = 0 only for a freshly inserted tuple.
        let row = sqlx::query_as::<_, ProvisionedRow>(
            r#"
            INSERT INTO workspaces (name, owner_id, subscription_plan, subscription_status, max_users, created_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, now(), now())
            ON CONFLICT (owner_id) DO UPDATE SET owner_id = EXCLUDED.owner_id
            RETURNING id, name, owner_id, subscription_plan, subscription_status, max_users,
                      created_at, updated_at, (xmax = 0) AS inserted
            "#,
        )
        .bind(&new.name)
        .bind(new.owner_id)
        .bind(&new.subscription_plan)
        .bind(new.max_users)
        .fetch_one(&self.pool)
        .await?;

        Ok(ProvisionedWorkspace {
            workspace: row.workspace,
            created: row.inserted,
        })
    }

    async fn find_workspace(&self, workspace_id: Uuid) -> StoreResult<Option<Workspace>> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT id, name, owner_id, subscription_plan, subscription_status, max_users,
                   created_at, updated_at
            FROM workspaces
            WHERE id = $1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(workspace)
    }

    async fn update_workspace_plan(
        &self,
        workspace_id: Uuid,
        plan: &str,
        status: SubscriptionStatus,
    ) -> StoreResult<Option<Workspace>> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces
            SET subscription_plan = $2, subscription_status = $3, updated_at = now()
            WHERE id = $1
            RETURNING id, name, owner_id, subscription_plan, subscription_status, max_users,
                      created_at, updated_at
            "#,
        )
        .bind(workspace_id)
        .bind(plan)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(workspace)
    }
}
