use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

pub const MIN_SESSION_MINUTES: i32 = 30;
pub const MAX_SESSION_MINUTES: i32 = 180;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
}

pub const TRAINING_SESSION_COLUMNS: &str =
    "id, trainer_id, member_id, scheduled_at, duration_minutes, status, notes, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingSession {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub member_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrainingSession {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn ensure_cancellable(&self) -> Result<(), AppError> {
        match self.status {
            SessionStatus::Scheduled => Ok(()),
            SessionStatus::Completed => Err(AppError::conflict("Session has already been completed")),
            SessionStatus::Cancelled => Err(AppError::conflict("Session is already cancelled")),
        }
    }

    pub fn ensure_completable(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        self.ensure_cancellable()?;
        if now < self.scheduled_at {
            return Err(AppError::rejected("Session has not started yet"));
        }
        Ok(())
    }
}

/// Session joined with the trainer and member names.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainingSessionDetails {
    pub id: Uuid,
    pub trainer_id: Uuid,
    pub trainer_name: String,
    pub member_id: Uuid,
    pub member_name: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: SessionStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookSessionRequest {
    pub trainer_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub notes: Option<String>,
}

impl BookSessionRequest {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.scheduled_at <= now {
            return Err(AppError::validation("Sessions must be booked in the future"));
        }
        if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&self.duration_minutes) {
            return Err(AppError::validation(format!(
                "Session length must be between {} and {} minutes",
                MIN_SESSION_MINUTES, MAX_SESSION_MINUTES
            )));
        }
        if self.notes.as_deref().is_some_and(|notes| notes.len() > 1000) {
            return Err(AppError::validation("Notes must be at most 1000 characters"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn booking(offset: Duration, duration_minutes: i32) -> BookSessionRequest {
        BookSessionRequest {
            trainer_id: Uuid::new_v4(),
            scheduled_at: Utc::now() + offset,
            duration_minutes,
            notes: None,
        }
    }

    fn session(status: SessionStatus, scheduled_at: DateTime<Utc>) -> TrainingSession {
        TrainingSession {
            id: Uuid::new_v4(),
            trainer_id: Uuid::new_v4(),
            member_id: Uuid::new_v4(),
            scheduled_at,
            duration_minutes: 60,
            status,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_booking_validation() {
        let now = Utc::now();
        assert!(booking(Duration::days(1), 60).validate(now).is_ok());
        assert_matches!(booking(Duration::hours(-1), 60).validate(now), Err(AppError::Validation(_)));
        assert_matches!(booking(Duration::days(1), 15).validate(now), Err(AppError::Validation(_)));
        assert_matches!(booking(Duration::days(1), 240).validate(now), Err(AppError::Validation(_)));
    }

    #[test]
    fn test_completion_requires_started_session() {
        let now = Utc::now();
        let upcoming = session(SessionStatus::Scheduled, now + Duration::hours(2));
        assert_matches!(upcoming.ensure_completable(now), Err(AppError::Rejected(_)));

        let past = session(SessionStatus::Scheduled, now - Duration::hours(2));
        assert!(past.ensure_completable(now).is_ok());
        assert_eq!(past.ends_at(), past.scheduled_at + Duration::minutes(60));

        let done = session(SessionStatus::Completed, now - Duration::hours(2));
        assert_matches!(done.ensure_completable(now), Err(AppError::Conflict(_)));
        assert_matches!(
            session(SessionStatus::Cancelled, now).ensure_cancellable(),
            Err(AppError::Conflict(_))
        );
    }
}
