use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{user_repository::UserRepository, StoreResult};
use crate::models::user::{MemberRole, MemberStatus, NewMembership, WorkspaceUser};

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_membership_by_identity(
        &self,
        identity_id: Uuid,
    ) -> StoreResult<Option<WorkspaceUser>> {
        let member = sqlx::query_as::<_, WorkspaceUser>(
            r#"
            SELECT id, workspace_id, email, full_name, role, status, department, created_at, last_active
            FROM users
            WHERE id = $1 AND status <> 'removed'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn find_membership_by_email(&self, email: &str) -> StoreResult<Option<WorkspaceUser>> {
        let member = sqlx::query_as::<_, WorkspaceUser>(
            r#"
            SELECT id, workspace_id, email, full_name, role, status, department, created_at, last_active
            FROM users
            WHERE lower(email) = lower($1) AND status <> 'removed'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn find_membership(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<WorkspaceUser>> {
        let member = sqlx::query_as::<_, WorkspaceUser>(
            r#"
            SELECT id, workspace_id, email, full_name, role, status, department, created_at, last_active
            FROM users
            WHERE workspace_id = $1 AND id = $2
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn find_workspace_member_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<WorkspaceUser>> {
        let member = sqlx::query_as::<_, WorkspaceUser>(
            r#"
            SELECT id, workspace_id, email, full_name, role, status, department, created_at, last_active
            FROM users
            WHERE workspace_id = $1 AND lower(email) = lower($2) AND status <> 'removed'
            LIMIT 1
            "#,
        )
        .bind(workspace_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn upsert_membership(&self, membership: &NewMembership) -> StoreResult<WorkspaceUser> {
        let member = sqlx::query_as::<_, WorkspaceUser>(
            r#"
            INSERT INTO users (id, workspace_id, email, full_name, role, status, department, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, now())
            ON CONFLICT (id, workspace_id) DO UPDATE SET
                email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                role = EXCLUDED.role,
                status = EXCLUDED.status,
                department = COALESCE(EXCLUDED.department, users.department)
            RETURNING id, workspace_id, email, full_name, role, status, department, created_at, last_active
            "#,
        )
        .bind(membership.id)
        .bind(membership.workspace_id)
        .bind(&membership.email)
        .bind(&membership.full_name)
        .bind(membership.role)
        .bind(membership.status)
        .bind(&membership.department)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    async fn list_members(
        &self,
        workspace_id: Uuid,
        status: Option<MemberStatus>,
    ) -> StoreResult<Vec<WorkspaceUser>> {
        let members = match status {
            Some(status) => {
                sqlx::query_as::<_, WorkspaceUser>(
                    r#"
                    SELECT id, workspace_id, email, full_name, role, status, department, created_at, last_active
                    FROM users
                    WHERE workspace_id = $1 AND status = $2
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(workspace_id)
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, WorkspaceUser>(
                    r#"
                    SELECT id, workspace_id, email, full_name, role, status, department, created_at, last_active
                    FROM users
                    WHERE workspace_id = $1 AND status <> 'removed'
                    ORDER BY created_at ASC
                    "#,
                )
                .bind(workspace_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(members)
    }

    async fn update_member_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> StoreResult<Option<WorkspaceUser>> {
        let member = sqlx::query_as::<_, WorkspaceUser>(
            r#"
            UPDATE users
            SET role = $3
            WHERE workspace_id = $1 AND id = $2
            RETURNING id, workspace_id, email, full_name, role, status, department, created_at, last_active
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn update_member_status(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        status: MemberStatus,
    ) -> StoreResult<Option<WorkspaceUser>> {
        let member = sqlx::query_as::<_, WorkspaceUser>(
            r#"
            UPDATE users
            SET status = $3
            WHERE workspace_id = $1 AND id = $2
            RETURNING id, workspace_id, email, full_name, role, status, department, created_at, last_active
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn touch_last_active(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_active = GREATEST(COALESCE(last_active, $3), $3)
            WHERE workspace_id = $1 AND id = $2
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
