use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{user::MemberRole, workspace::SubscriptionPlan};

/// Sentinel for plans without a seat allotment ceiling.
pub const UNLIMITED_USERS: i64 = -1;
pub const DEFAULT_PER_SEAT_RATE_CENTS: i64 = 800;
pub const BILLING_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub included_users: i64,
    pub per_seat_rate_cents: i64,
    pub base_plan_cost_cents: i64,
}

impl PlanLimits {
    pub fn is_unlimited(&self) -> bool {
        self.included_users == UNLIMITED_USERS
    }

    /// `included_users` is a count or the unlimited sentinel; money is never
    /// negative.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.included_users < UNLIMITED_USERS {
            return Err("included_users must be >= 0, or -1 for unlimited");
        }
        if self.per_seat_rate_cents < 0 {
            return Err("per_seat_rate_cents must not be negative");
        }
        if self.base_plan_cost_cents < 0 {
            return Err("base_plan_cost_cents must not be negative");
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PlanTableError {
    #[error("malformed plan table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("plan '{plan}': {reason}")]
    InvalidLimits { plan: String, reason: &'static str },
}

/// Plan name -> limits. Lookups are exact on the normalized name; there is no
/// fallback tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanLimitsTable(HashMap<String, PlanLimits>);

impl PlanLimitsTable {
    pub fn with_per_seat_rate(per_seat_rate_cents: i64) -> Self {
        let mut plans = HashMap::new();
        for plan in SubscriptionPlan::ALL {
            let (included_users, base_plan_cost_cents) = match plan {
                SubscriptionPlan::Free => (3, 0),
                SubscriptionPlan::Pro => (10, 2_900),
                SubscriptionPlan::Business => (25, 9_900),
                SubscriptionPlan::Enterprise => (UNLIMITED_USERS, 49_900),
            };
            plans.insert(
                plan.as_str().to_string(),
                PlanLimits {
                    included_users,
                    per_seat_rate_cents,
                    base_plan_cost_cents,
                },
            );
        }
        Self(plans)
    }

    pub fn from_json(raw: &str) -> Result<Self, PlanTableError> {
        let parsed: HashMap<String, PlanLimits> = serde_json::from_str(raw)?;
        let mut plans = HashMap::with_capacity(parsed.len());
        for (name, limits) in parsed {
            let plan = normalize_plan_name(&name);
            limits
                .validate()
                .map_err(|reason| PlanTableError::InvalidLimits {
                    plan: plan.clone(),
                    reason,
                })?;
            plans.insert(plan, limits);
        }
        Ok(Self(plans))
    }

    pub fn get(&self, plan: &str) -> Option<&PlanLimits> {
        self.0.get(&normalize_plan_name(plan))
    }

    pub fn contains(&self, plan: &str) -> bool {
        self.get(plan).is_some()
    }

    pub fn insert(&mut self, plan: &str, limits: PlanLimits) {
        self.0.insert(normalize_plan_name(plan), limits);
    }
}

impl Default for PlanLimitsTable {
    fn default() -> Self {
        Self::with_per_seat_rate(DEFAULT_PER_SEAT_RATE_CENTS)
    }
}

pub fn normalize_plan_name(plan: &str) -> String {
    plan.trim().to_lowercase()
}

/// Derived, never persisted. All money values are integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCalculation {
    pub total_users: i64,
    pub included_users: i64,
    pub additional_users: i64,
    pub base_plan_cost_cents: i64,
    pub per_seat_rate_cents: i64,
    pub additional_cost_cents: i64,
    pub total_cost_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveUserSummary {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: MemberRole,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_active: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingDisplay {
    pub base_plan_cost: String,
    pub additional_cost: String,
    pub total_cost: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingReport {
    pub workspace_id: Uuid,
    pub subscription_plan: String,
    #[serde(with = "time::serde::rfc3339")]
    pub period_start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub period_end: OffsetDateTime,
    pub calculation: BillingCalculation,
    pub display: BillingDisplay,
    pub active_users: Vec<ActiveUserSummary>,
}

/// Two-decimal rendering for display only.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
