use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::user::MemberRole;

pub const INVITATION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "invitation_status")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Cancelled,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    pub id: Uuid,
    pub email: String,
    pub workspace_id: Uuid,
    pub role: MemberRole,
    pub invited_by: Uuid,
    pub invited_by_name: Option<String>,
    #[serde(skip_serializing)]
    pub invite_token: String,
    pub status: InvitationStatus,
    pub custom_message: Option<String>,
    pub department: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub invited_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub accepted_at: Option<OffsetDateTime>,
    pub accepted_by: Option<Uuid>,
}

impl Invitation {
    /// Expiry is evaluated lazily: a stored `pending` row past its
    /// `expires_at` reads as `expired`.
    pub fn effective_status(&self, now: OffsetDateTime) -> InvitationStatus {
        if self.status == InvitationStatus::Pending && self.expires_at <= now {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }

    pub fn is_acceptable(&self, now: OffsetDateTime) -> bool {
        self.effective_status(now) == InvitationStatus::Pending
    }
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub email: String,
    pub workspace_id: Uuid,
    pub role: MemberRole,
    pub invited_by: Uuid,
    pub invited_by_name: Option<String>,
    pub invite_token: String,
    pub custom_message: Option<String>,
    pub department: Option<String>,
    pub invited_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Listing shape for inviters: carries the lazily computed status.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationView {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub effective_status: InvitationStatus,
}

impl InvitationView {
    pub fn new(invitation: Invitation, now: OffsetDateTime) -> Self {
        let effective_status = invitation.effective_status(now);
        Self {
            invitation,
            effective_status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvitationPreview {
    pub email: String,
    pub workspace_id: Uuid,
    pub workspace_name: String,
    pub role: MemberRole,
    pub invited_by_name: Option<String>,
    pub custom_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}
