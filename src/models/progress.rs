use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub recorded_on: NaiveDate,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RecordProgressRequest {
    pub recorded_on: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub notes: Option<String>,
}

fn check_range(name: &str, value: Option<f64>, min: f64, max: f64) -> Result<(), AppError> {
    match value {
        Some(v) if !(min..=max).contains(&v) => Err(AppError::validation(format!(
            "{} must be between {} and {}",
            name, min, max
        ))),
        _ => Ok(()),
    }
}

impl RecordProgressRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), AppError> {
        if self.weight_kg.is_none()
            && self.body_fat_pct.is_none()
            && self.chest_cm.is_none()
            && self.waist_cm.is_none()
        {
            return Err(AppError::validation("At least one measurement is required"));
        }
        if self.recorded_on.is_some_and(|date| date > today) {
            return Err(AppError::validation("Measurements cannot be recorded in the future"));
        }

        check_range("weight_kg", self.weight_kg, 20.0, 400.0)?;
        check_range("body_fat_pct", self.body_fat_pct, 2.0, 75.0)?;
        check_range("chest_cm", self.chest_cm, 40.0, 250.0)?;
        check_range("waist_cm", self.waist_cm, 40.0, 250.0)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutPerformance {
    pub id: Uuid,
    pub user_id: Uuid,
    pub performed_on: NaiveDate,
    pub exercise: String,
    pub sets: i32,
    pub reps: i32,
    pub weight_kg: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LogWorkoutRequest {
    pub performed_on: Option<NaiveDate>,
    pub exercise: String,
    pub sets: i32,
    pub reps: i32,
    pub weight_kg: Option<f64>,
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
}

impl LogWorkoutRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), AppError> {
        let exercise = self.exercise.trim();
        if exercise.is_empty() || exercise.len() > 100 {
            return Err(AppError::validation("exercise must be between 1 and 100 characters"));
        }
        if !(1..=100).contains(&self.sets) {
            return Err(AppError::validation("sets must be between 1 and 100"));
        }
        if !(1..=1000).contains(&self.reps) {
            return Err(AppError::validation("reps must be between 1 and 1000"));
        }
        check_range("weight_kg", self.weight_kg, 0.0, 1000.0)?;
        if self.duration_minutes.is_some_and(|m| !(1..=600).contains(&m)) {
            return Err(AppError::validation("duration_minutes must be between 1 and 600"));
        }
        if self.performed_on.is_some_and(|date| date > today) {
            return Err(AppError::validation("Workouts cannot be logged in the future"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WorkoutSummary {
    pub total_workouts: i64,
    pub total_sets: i64,
    pub total_volume_kg: f64,
    pub distinct_exercises: i64,
    pub last_workout_on: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
    }

    fn workout(sets: i32, reps: i32) -> LogWorkoutRequest {
        LogWorkoutRequest {
            performed_on: None,
            exercise: "Back squat".to_string(),
            sets,
            reps,
            weight_kg: Some(100.0),
            duration_minutes: None,
            notes: None,
        }
    }

    #[test]
    fn test_progress_needs_a_measurement() {
        let empty = RecordProgressRequest {
            recorded_on: None,
            weight_kg: None,
            body_fat_pct: None,
            chest_cm: None,
            waist_cm: None,
            notes: Some("felt good".to_string()),
        };
        assert!(empty.validate(today()).is_err());

        let weighed = RecordProgressRequest { weight_kg: Some(82.5), ..empty };
        assert!(weighed.validate(today()).is_ok());
    }

    #[test]
    fn test_progress_rejects_implausible_values_and_future_dates() {
        let request = RecordProgressRequest {
            recorded_on: Some(today()),
            weight_kg: Some(5.0),
            body_fat_pct: None,
            chest_cm: None,
            waist_cm: None,
            notes: None,
        };
        assert!(request.validate(today()).is_err());

        let request = RecordProgressRequest {
            recorded_on: today().succ_opt(),
            weight_kg: Some(80.0),
            ..request
        };
        assert!(request.validate(today()).is_err());
    }

    #[test]
    fn test_workout_validation() {
        assert!(workout(5, 5).validate(today()).is_ok());
        assert!(workout(0, 5).validate(today()).is_err());
        assert!(workout(3, 0).validate(today()).is_err());

        let mut blank = workout(3, 10);
        blank.exercise = "   ".to_string();
        assert!(blank.validate(today()).is_err());
    }
}
