use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GymFeedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub category: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GymFeedbackEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub feedback: GymFeedback,
    pub member_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GymFeedbackRequest {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub category: String,
    #[validate(length(min = 1, max = 4000, message = "must be between 1 and 4000 characters"))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainerFeedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trainer_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrainerFeedbackRequest {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i16,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        let ok = GymFeedbackRequest {
            rating: 5,
            category: "facilities".to_string(),
            message: "Showers are spotless".to_string(),
        };
        assert!(ok.validate().is_ok());

        let too_high = GymFeedbackRequest { rating: 6, ..ok };
        assert!(too_high.validate().is_err());

        let zero = TrainerFeedbackRequest { rating: 0, comment: None };
        assert!(zero.validate().is_err());
    }
}
