use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{identity_repository::IdentityRepository, StoreResult};
use crate::models::identity::{Identity, NewIdentity};

pub struct PostgresIdentityRepository {
    pub pool: PgPool,
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn find_identity_by_id(&self, identity_id: Uuid) -> StoreResult<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, password_hash, display_name, confirmed_at, created_at
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(identity_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, password_hash, display_name, confirmed_at, created_at
            FROM identities
            WHERE email = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }

    async fn create_identity(&self, identity: &NewIdentity) -> StoreResult<Identity> {
        let created = sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO identities (email, password_hash, display_name, confirmed_at, created_at)
            VALUES (lower($1), $2, $3, CASE WHEN $4 THEN now() ELSE NULL END, now())
            RETURNING id, email, password_hash, display_name, confirmed_at, created_at
            "#,
        )
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(&identity.display_name)
        .bind(identity.confirmed)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn mark_identity_confirmed(&self, identity_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "UPDATE identities SET confirmed_at = COALESCE(confirmed_at, now()) WHERE id = $1",
        )
        .bind(identity_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_identity(&self, identity_id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM identities WHERE id = $1")
            .bind(identity_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
