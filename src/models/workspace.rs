use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use time::OffsetDateTime;
use uuid::Uuid;

pub const WORKSPACE_PLAN_FREE: &str = "free";
pub const DEFAULT_WORKSPACE_MAX_USERS: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Free,
    Pro,
    Business,
    Enterprise,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 4] = [
        SubscriptionPlan::Free,
        SubscriptionPlan::Pro,
        SubscriptionPlan::Business,
        SubscriptionPlan::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Business => "business",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "subscription_status")]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Cancelled,
}

/// A billing and membership boundary. `subscription_plan` is kept as the raw
/// stored name so that plans missing from the limits table surface as errors
/// instead of being coerced into a known tier.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub subscription_plan: String,
    pub subscription_status: SubscriptionStatus,
    pub max_users: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub name: String,
    pub owner_id: Uuid,
    pub subscription_plan: String,
    pub max_users: i32,
}

/// Result of the owner-keyed upsert; `created` is false when a concurrent
/// caller already inserted the row.
#[derive(Debug, Clone)]
pub struct ProvisionedWorkspace {
    pub workspace: Workspace,
    pub created: bool,
}

pub fn default_workspace_name(email: &str) -> String {
    let local = email
        .trim()
        .split('@')
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("My");
    format!("{local}'s Workspace")
}
