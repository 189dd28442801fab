use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

pub const TRAINER_COLUMNS: &str =
    "id, user_id, full_name, specialization, bio, hourly_rate_cents, is_active, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trainer {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub specialization: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainerProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub trainer: Trainer,
    pub average_rating: Option<f64>,
    pub feedback_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTrainerRequest {
    /// Existing user account to link; the account is promoted to the trainer role.
    pub user_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub full_name: String,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub specialization: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub bio: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub hourly_rate_cents: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTrainerRequest {
    #[validate(length(min = 1, max = 120, message = "must be between 1 and 120 characters"))]
    pub full_name: Option<String>,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub specialization: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub bio: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub hourly_rate_cents: Option<i64>,
    pub is_active: Option<bool>,
}
