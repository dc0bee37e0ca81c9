use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    invitation_repository::{AcceptInvitation, InvitationRepository},
    StoreResult,
};
use crate::models::{
    invitation::{Invitation, NewInvitation},
    user::WorkspaceUser,
};

pub struct PostgresInvitationRepository {
    pub pool: PgPool,
}

#[async_trait]
impl InvitationRepository for PostgresInvitationRepository {
    async fn upsert_invitation(&self, invitation: &NewInvitation) -> StoreResult<Invitation> {
        let row = sqlx::query_as::<_, Invitation>(
            r#"
            INSERT INTO user_invitations
                (email, workspace_id, role, invited_by, invited_by_name, invite_token, status,
                 custom_message, department, created_at, invited_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $9, $9, $10)
            ON CONFLICT (email, workspace_id) DO UPDATE SET
                role = EXCLUDED.role,
                invited_by = EXCLUDED.invited_by,
                invited_by_name = EXCLUDED.invited_by_name,
                invite_token = CASE WHEN user_invitations.status = 'pending'
                    THEN user_invitations.invite_token ELSE EXCLUDED.invite_token END,
                status = 'pending',
                custom_message = EXCLUDED.custom_message,
                department = EXCLUDED.department,
                invited_at = EXCLUDED.invited_at,
                expires_at = EXCLUDED.expires_at,
                accepted_at = NULL,
                accepted_by = NULL
            RETURNING id, email, workspace_id, role, invited_by, invited_by_name, invite_token,
                      status, custom_message, department, created_at, invited_at, expires_at,
                      accepted_at, accepted_by
            "#,
        )
        .bind(&invitation.email)
        .bind(invitation.workspace_id)
        .bind(invitation.role)
        .bind(invitation.invited_by)
        .bind(&invitation.invited_by_name)
        .bind(&invitation.invite_token)
        .bind(&invitation.custom_message)
        .bind(&invitation.department)
        .bind(invitation.invited_at)
        .bind(invitation.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_invitation(&self, invite_id: Uuid) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, email, workspace_id, role, invited_by, invited_by_name, invite_token,
                   status, custom_message, department, created_at, invited_at, expires_at,
                   accepted_at, accepted_by
            FROM user_invitations
            WHERE id = $1
            "#,
        )
        .bind(invite_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_invitation_by_email(
        &self,
        workspace_id: Uuid,
        email: &str,
    ) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, email, workspace_id, role, invited_by, invited_by_name, invite_token,
                   status, custom_message, department, created_at, invited_at, expires_at,
                   accepted_at, accepted_by
            FROM user_invitations
            WHERE workspace_id = $1 AND email = $2
            "#,
        )
        .bind(workspace_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_pending_invitation_by_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, email, workspace_id, role, invited_by, invited_by_name, invite_token,
                   status, custom_message, department, created_at, invited_at, expires_at,
                   accepted_at, accepted_by
            FROM user_invitations
            WHERE invite_token = $1 AND status = 'pending'
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_invitations(&self, workspace_id: Uuid) -> StoreResult<Vec<Invitation>> {
        let rows = sqlx::query_as::<_, Invitation>(
            r#"
            SELECT id, email, workspace_id, role, invited_by, invited_by_name, invite_token,
                   status, custom_message, department, created_at, invited_at, expires_at,
                   accepted_at, accepted_by
            FROM user_invitations
            WHERE workspace_id = $1
            ORDER BY invited_at DESC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn refresh_invitation(
        &self,
        invite_id: Uuid,
        invited_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query_as::<_, Invitation>(
            r#"
            UPDATE user_invitations
            SET invited_at = $2, expires_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING id, email, workspace_id, role, invited_by, invited_by_name, invite_token,
                      status, custom_message, department, created_at, invited_at, expires_at,
                      accepted_at, accepted_by
            "#,
        )
        .bind(invite_id)
        .bind(invited_at)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn cancel_invitation(&self, invite_id: Uuid) -> StoreResult<Option<Invitation>> {
        let row = sqlx::query_as::<_, Invitation>(
            r#"
            UPDATE user_invitations
            SET status = 'cancelled'
            WHERE id = $1 AND status = 'pending'
            RETURNING id, email, workspace_id, role, invited_by, invited_by_name, invite_token,
                      status, custom_message, department, created_at, invited_at, expires_at,
                      accepted_at, accepted_by
            "#,
        )
        .bind(invite_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_invitation_expired(&self, invite_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE user_invitations SET status = 'expired' WHERE id = $1 AND status = 'pending'",
        )
        .bind(invite_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn accept_invitation(
        &self,
        accept: &AcceptInvitation,
    ) -> StoreResult<Option<WorkspaceUser>> {
        let mut tx = self.pool.begin().await?;

        let transitioned = sqlx::query(
            r#"
            UPDATE user_invitations
            SET status = 'accepted', accepted_at = $2, accepted_by = $3
            WHERE id = $1 AND status = 'pending' AND expires_at > $2
            "#,
        )
        .bind(accept.invitation_id)
        .bind(accept.accepted_at)
        .bind(accept.accepted_by)
        .execute(&mut *tx)
        .await?;

        if transitioned.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let membership = &accept.membership;
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
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(member))
    }
}
