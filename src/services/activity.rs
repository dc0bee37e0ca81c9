use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{activity_repository::ActivityRepository, user_repository::UserRepository};
use crate::errors::AppError;
use crate::models::activity::ActivityRecord;
use crate::services::{access::require_member, AuthContext};

const MAX_EVENT_TYPE_LEN: usize = 64;

/// Write side of activity tracking. Billing reads the same events through
/// `ActivityRepository::list_active_user_ids`.
pub struct ActivityTracker {
    activity: Arc<dyn ActivityRepository>,
    users: Arc<dyn UserRepository>,
}

impl ActivityTracker {
    pub fn new(activity: Arc<dyn ActivityRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { activity, users }
    }

    pub async fn record(
        &self,
        auth: &AuthContext,
        workspace_id: Uuid,
        event_type: &str,
        at: OffsetDateTime,
    ) -> Result<ActivityRecord, AppError> {
        let event_type = event_type.trim();
        if event_type.is_empty() || event_type.len() > MAX_EVENT_TYPE_LEN {
            return Err(AppError::validation(format!(
                "event_type must be 1 to {MAX_EVENT_TYPE_LEN} characters"
            )));
        }
        let member = require_member(self.users.as_ref(), auth, workspace_id).await?;

        let record = self
            .activity
            .record_activity(workspace_id, member.id, event_type, at)
            .await?;
        if let Err(err) = self.users.touch_last_active(workspace_id, member.id, at).await {
            warn!(%workspace_id, user_id = %member.id, error = %err, "failed to update last_active");
        }
        debug!(%workspace_id, user_id = %member.id, event_type, "activity recorded");
        Ok(record)
    }
}
