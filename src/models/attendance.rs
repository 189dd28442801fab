use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::MembershipState;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "check_in_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CheckInMethod {
    Qr,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attendance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub member_plan_id: Option<Uuid>,
    pub checked_in_at: DateTime<Utc>,
    pub method: CheckInMethod,
    pub recorded_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendance: Attendance,
    pub member_name: String,
    pub member_email: String,
}

/// Signed content of a member's QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    pub member_id: Uuid,
    pub issued_on: NaiveDate,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct QrCodeResponse {
    pub success: bool,
    /// JSON string to encode into the QR image.
    pub payload: String,
    pub valid_on: NaiveDate,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    /// Raw text scanned from the QR code.
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct ManualCheckInRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CheckInResult {
    pub success: bool,
    pub attendance: Attendance,
    pub member_name: String,
    pub membership: MembershipState,
}

/// Decide whether a member may enter, given their membership and their last check-in.
pub fn evaluate_check_in(
    state: &MembershipState,
    last_check_in: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Result<(), AppError> {
    if !state.is_active() {
        return Err(AppError::rejected(state.inactive_reason()));
    }

    if let Some(last) = last_check_in {
        let next_allowed = last + cooldown;
        if now < next_allowed {
            return Err(AppError::rejected(format!(
                "Already checked in; next check-in allowed at {}",
                next_allowed.format("%H:%M UTC")
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn active() -> MembershipState {
        MembershipState::Active {
            days_remaining: 12,
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        }
    }

    #[test]
    fn test_active_member_without_history_checks_in() {
        assert!(evaluate_check_in(&active(), None, Utc::now(), Duration::hours(1)).is_ok());
    }

    #[test]
    fn test_second_check_in_within_an_hour_is_rejected() {
        let now = Utc::now();
        let cooldown = Duration::minutes(60);

        assert_matches!(
            evaluate_check_in(&active(), Some(now - Duration::minutes(59)), now, cooldown),
            Err(AppError::Rejected(_))
        );
        assert!(evaluate_check_in(&active(), Some(now - Duration::minutes(60)), now, cooldown).is_ok());
    }

    #[test]
    fn test_inactive_memberships_cannot_check_in() {
        let now = Utc::now();
        let states = [
            MembershipState::None,
            MembershipState::Pending,
            MembershipState::Cancelled,
            MembershipState::Expired { ended_on: None },
            MembershipState::Frozen { until: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() },
        ];

        for state in states {
            let err = evaluate_check_in(&state, None, now, Duration::hours(1)).unwrap_err();
            assert_eq!(err.public_message(), state.inactive_reason());
        }
    }
}
