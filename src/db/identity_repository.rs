use async_trait::async_trait;
use uuid::Uuid;

use super::StoreResult;
use crate::models::identity::{Identity, NewIdentity};

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn find_identity_by_id(&self, identity_id: Uuid) -> StoreResult<Option<Identity>>;

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    async fn create_identity(&self, identity: &NewIdentity) -> StoreResult<Identity>;

    async fn mark_identity_confirmed(&self, identity_id: Uuid) -> StoreResult<()>;

    /// Compensation for a half-finished provisioning flow.
    async fn delete_identity(&self, identity_id: Uuid) -> StoreResult<()>;
}
