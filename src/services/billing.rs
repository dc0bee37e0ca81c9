use std::{collections::HashSet, sync::Arc};

use time::{Duration, OffsetDateTime};
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{
    activity_repository::ActivityRepository, user_repository::UserRepository,
    workspace_repository::WorkspaceRepository,
};
use crate::errors::AppError;
use crate::models::{
    billing::{
        format_cents, ActiveUserSummary, BillingCalculation, BillingDisplay, BillingReport,
        PlanLimits, PlanLimitsTable, BILLING_WINDOW_DAYS,
    },
    user::MemberStatus,
};

/// Trailing window `[now - 30d, now)`.
pub fn billing_window(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    (now - Duration::days(BILLING_WINDOW_DAYS), now)
}

/// Pure fee computation. The unlimited sentinel is checked before any
/// subtraction so it can never produce negative or phantom overage.
pub fn compute_bill(limits: &PlanLimits, total_users: i64) -> BillingCalculation {
    let total_users = total_users.max(0);
    let additional_users = if limits.is_unlimited() {
        0
    } else {
        (total_users - limits.included_users).max(0)
    };
    let additional_cost_cents = additional_users.saturating_mul(limits.per_seat_rate_cents);

    BillingCalculation {
        total_users,
        included_users: limits.included_users,
        additional_users,
        base_plan_cost_cents: limits.base_plan_cost_cents,
        per_seat_rate_cents: limits.per_seat_rate_cents,
        additional_cost_cents,
        total_cost_cents: limits
            .base_plan_cost_cents
            .saturating_add(additional_cost_cents),
    }
}

pub struct BillingCalculator {
    workspaces: Arc<dyn WorkspaceRepository>,
    users: Arc<dyn UserRepository>,
    activity: Arc<dyn ActivityRepository>,
    plans: Arc<PlanLimitsTable>,
}

impl BillingCalculator {
    pub fn new(
        workspaces: Arc<dyn WorkspaceRepository>,
        users: Arc<dyn UserRepository>,
        activity: Arc<dyn ActivityRepository>,
        plans: Arc<PlanLimitsTable>,
    ) -> Self {
        Self {
            workspaces,
            users,
            activity,
            plans,
        }
    }

    /// Billable users are active members with at least one activity event
    /// inside the window.
    pub async fn calculate(
        &self,
        workspace_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<BillingReport, AppError> {
        let workspace = self
            .workspaces
            .find_workspace(workspace_id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;

        let Some(limits) = self.plans.get(&workspace.subscription_plan).copied() else {
            error!(
                %workspace_id,
                plan = %workspace.subscription_plan,
                "no plan limits configured for workspace plan"
            );
            return Err(AppError::UnknownPlan(workspace.subscription_plan));
        };

        let members = self
            .users
            .list_members(workspace_id, Some(MemberStatus::Active))
            .await?;
        let (period_start, period_end) = billing_window(now);
        let active_ids: HashSet<Uuid> = self
            .activity
            .list_active_user_ids(workspace_id, period_start, period_end)
            .await?
            .into_iter()
            .collect();

        let active_users: Vec<ActiveUserSummary> = members
            .into_iter()
            .filter(|member| active_ids.contains(&member.id))
            .map(|member| ActiveUserSummary {
                id: member.id,
                email: member.email,
                full_name: member.full_name,
                role: member.role,
                last_active: member.last_active,
            })
            .collect();

        let calculation = compute_bill(&limits, active_users.len() as i64);
        info!(
            %workspace_id,
            plan = %workspace.subscription_plan,
            total_users = calculation.total_users,
            additional_users = calculation.additional_users,
            total_cost_cents = calculation.total_cost_cents,
            "calculated workspace bill"
        );

        Ok(BillingReport {
            workspace_id,
            subscription_plan: workspace.subscription_plan,
            period_start,
            period_end,
            display: BillingDisplay {
                base_plan_cost: format_cents(calculation.base_plan_cost_cents),
                additional_cost: format_cents(calculation.additional_cost_cents),
                total_cost: format_cents(calculation.total_cost_cents),
            },
            calculation,
            active_users,
        })
    }
}
