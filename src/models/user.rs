use core::fmt;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "member_role")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
            MemberRole::Viewer => "viewer",
        }
    }

    pub fn is_admin_or_owner(self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "member_status")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Pending,
    Inactive,
    Suspended,
    Removed,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Pending => "pending",
            MemberStatus::Inactive => "inactive",
            MemberStatus::Suspended => "suspended",
            MemberStatus::Removed => "removed",
        }
    }
}

/// Membership row in the `users` table. `id` is the identity id, so the pair
/// `(id, workspace_id)` is the conflict key for upserts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkspaceUser {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub department: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_active: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct NewMembership {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    pub department: Option<String>,
}
