use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

pub const CLASS_COLUMNS: &str =
    "id, name, description, trainer_id, starts_at, duration_minutes, capacity, is_cancelled, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GymClass {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub trainer_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
}

impl GymClass {
    /// Checks run with the class row locked, before inserting an enrollment.
    pub fn ensure_open_for_enrollment(&self, enrolled: i64, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.is_cancelled {
            return Err(AppError::rejected("Class has been cancelled"));
        }
        if self.starts_at <= now {
            return Err(AppError::rejected("Class has already started"));
        }
        if enrolled >= i64::from(self.capacity) {
            return Err(AppError::conflict("Class is full"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ClassListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub class: GymClass,
    pub trainer_name: Option<String>,
    pub enrolled_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassEnrollment {
    pub id: Uuid,
    pub class_id: Uuid,
    pub user_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateClassRequest {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub name: String,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,
    pub trainer_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    #[validate(range(min = 15, max = 240, message = "must be between 15 and 240 minutes"))]
    pub duration_minutes: i32,
    #[validate(range(min = 1, max = 200, message = "must be between 1 and 200"))]
    pub capacity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn class(capacity: i32, starts_in: Duration) -> GymClass {
        GymClass {
            id: Uuid::new_v4(),
            name: "Spin".to_string(),
            description: None,
            trainer_id: None,
            starts_at: Utc::now() + starts_in,
            duration_minutes: 45,
            capacity,
            is_cancelled: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_capacity_is_enforced() {
        let now = Utc::now();
        let spin = class(2, Duration::hours(3));
        assert!(spin.ensure_open_for_enrollment(0, now).is_ok());
        assert!(spin.ensure_open_for_enrollment(1, now).is_ok());
        assert_matches!(spin.ensure_open_for_enrollment(2, now), Err(AppError::Conflict(_)));
    }

    #[test]
    fn test_started_or_cancelled_classes_are_closed() {
        let now = Utc::now();
        let started = class(10, Duration::minutes(-5));
        assert_matches!(started.ensure_open_for_enrollment(0, now), Err(AppError::Rejected(_)));

        let mut cancelled = class(10, Duration::hours(3));
        cancelled.is_cancelled = true;
        assert_matches!(cancelled.ensure_open_for_enrollment(0, now), Err(AppError::Rejected(_)));
    }
}
