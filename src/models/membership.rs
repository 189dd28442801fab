use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// An active plan with fewer days left than this may be renewed early.
pub const RENEWAL_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MembershipPlan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 80, message = "must be between 1 and 80 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "must be positive"))]
    pub price_cents: i64,
    #[validate(range(min = 1, max = 3660, message = "must be between 1 and 3660 days"))]
    pub duration_days: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1, max = 80, message = "must be between 1 and 80 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "must be positive"))]
    pub price_cents: Option<i64>,
    #[validate(range(min = 1, max = 3660, message = "must be between 1 and 3660 days"))]
    pub duration_days: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "member_plan_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemberPlanStatus {
    Pending,
    Active,
    Frozen,
    Expired,
    Cancelled,
}

pub const MEMBER_PLAN_COLUMNS: &str =
    "id, user_id, plan_id, status, start_date, end_date, freeze_start, freeze_end, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: MemberPlanStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub freeze_start: Option<NaiveDate>,
    pub freeze_end: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Effective membership state, derived from the stored status and the dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MembershipState {
    None,
    Pending,
    Active { days_remaining: i64, end_date: NaiveDate },
    Frozen { until: NaiveDate },
    Expired { ended_on: Option<NaiveDate> },
    Cancelled,
}

impl MembershipState {
    pub fn is_active(&self) -> bool {
        matches!(self, MembershipState::Active { .. })
    }

    /// Reason shown when the state does not allow entry or bookings.
    pub fn inactive_reason(&self) -> &'static str {
        match self {
            MembershipState::Active { .. } => "Membership is active",
            MembershipState::None => "No membership on file",
            MembershipState::Pending => "Membership is awaiting payment approval",
            MembershipState::Frozen { .. } => "Membership is frozen",
            MembershipState::Expired { .. } => "Membership has expired",
            MembershipState::Cancelled => "Membership was cancelled",
        }
    }
}

impl MemberPlan {
    pub fn is_frozen_on(&self, date: NaiveDate) -> bool {
        match (self.freeze_start, self.freeze_end) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }

    pub fn state_on(&self, today: NaiveDate) -> MembershipState {
        match self.status {
            MemberPlanStatus::Cancelled => MembershipState::Cancelled,
            MemberPlanStatus::Pending => MembershipState::Pending,
            MemberPlanStatus::Expired => MembershipState::Expired { ended_on: self.end_date },
            MemberPlanStatus::Active | MemberPlanStatus::Frozen => {
                let (Some(start), Some(end)) = (self.start_date, self.end_date) else {
                    return MembershipState::Pending;
                };

                if today > end {
                    MembershipState::Expired { ended_on: Some(end) }
                } else if self.is_frozen_on(today) {
                    MembershipState::Frozen {
                        until: self.freeze_end.unwrap_or(end),
                    }
                } else if today < start {
                    MembershipState::Pending
                } else {
                    MembershipState::Active {
                        days_remaining: (end - today).num_days(),
                        end_date: end,
                    }
                }
            }
        }
    }

    /// Validate a freeze request and return its length in days (inclusive).
    pub fn validate_freeze(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
        max_days: i64,
    ) -> Result<i64, AppError> {
        match self.state_on(today) {
            MembershipState::Active { .. } => {}
            MembershipState::Frozen { .. } => {
                return Err(AppError::conflict("Membership is already frozen"));
            }
            other => return Err(AppError::rejected(other.inactive_reason())),
        }

        if self.freeze_start.is_some() {
            return Err(AppError::conflict("Membership has already been frozen once"));
        }
        if start < today {
            return Err(AppError::validation("Freeze cannot start in the past"));
        }
        if end < start {
            return Err(AppError::validation("Freeze end date must not be before its start date"));
        }

        let length = (end - start).num_days() + 1;
        if length > max_days {
            return Err(AppError::validation(format!(
                "Freeze cannot exceed {} days",
                max_days
            )));
        }

        if let Some(plan_end) = self.end_date {
            if start > plan_end {
                return Err(AppError::validation("Freeze must start before the membership ends"));
            }
        }

        Ok(length)
    }

    /// Validate cancelling a scheduled freeze and return the days to give back.
    pub fn validate_cancel_freeze(&self, today: NaiveDate) -> Result<i64, AppError> {
        match (self.freeze_start, self.freeze_end) {
            (Some(start), Some(end)) if start > today => Ok((end - start).num_days() + 1),
            (Some(_), Some(_)) => Err(AppError::rejected("A freeze that has started cannot be cancelled")),
            _ => Err(AppError::not_found("Scheduled freeze")),
        }
    }
}

/// Decide whether a member may pick a new plan given their latest one.
pub fn ensure_can_select_plan(current: Option<&MemberPlan>, today: NaiveDate) -> Result<(), AppError> {
    let Some(current) = current else {
        return Ok(());
    };

    match current.state_on(today) {
        MembershipState::Pending => Err(AppError::conflict("A plan is already awaiting payment")),
        MembershipState::Frozen { .. } => {
            Err(AppError::conflict("A frozen membership cannot be changed"))
        }
        MembershipState::Active { days_remaining, .. } if days_remaining > RENEWAL_WINDOW_DAYS => {
            Err(AppError::conflict("Current membership is still active"))
        }
        _ => Ok(()),
    }
}

/// Start and end dates of a plan activated on `today`.
pub fn activation_window(today: NaiveDate, duration_days: i32) -> (NaiveDate, NaiveDate) {
    (today, today + Duration::days(i64::from(duration_days)))
}

#[derive(Debug, Deserialize)]
pub struct SelectPlanRequest {
    pub plan_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct FreezeRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MembershipOverview {
    pub member_plan: Option<MemberPlan>,
    pub plan: Option<MembershipPlan>,
    pub state: MembershipState,
    pub balance_cents: i64,
}
