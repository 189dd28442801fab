use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    page_limit, page_offset, GymFeedback, GymFeedbackEntry, GymFeedbackRequest, TrainerFeedback,
    TrainerFeedbackRequest,
};

#[derive(Clone)]
pub struct FeedbackService {
    db: PgPool,
}

impl FeedbackService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn submit_gym_feedback(&self, user_id: Uuid, request: GymFeedbackRequest) -> AppResult<GymFeedback> {
        request.validate()?;

        let feedback = sqlx::query_as::<_, GymFeedback>(
            r#"
            INSERT INTO gym_feedback (user_id, rating, category, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, rating, category, message, created_at
            "#,
        )
        .bind(user_id)
        .bind(request.rating)
        .bind(request.category.trim().to_lowercase())
        .bind(request.message.trim())
        .fetch_one(&self.db)
        .await?;

        info!(%user_id, rating = feedback.rating, "Gym feedback submitted");
        Ok(feedback)
    }

    /// Rate a trainer. Only members who completed a session with them may do so;
    /// a second submission replaces the first.
    pub async fn submit_trainer_feedback(
        &self,
        user_id: Uuid,
        trainer_id: Uuid,
        request: TrainerFeedbackRequest,
    ) -> AppResult<TrainerFeedback> {
        request.validate()?;

        let trainer_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM trainers WHERE id = $1)")
            .bind(trainer_id)
            .fetch_one(&self.db)
            .await?;
        if !trainer_exists {
            return Err(AppError::not_found("Trainer"));
        }

        let trained_with: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM training_sessions
                WHERE member_id = $1 AND trainer_id = $2 AND status = 'completed'
            )
            "#,
        )
        .bind(user_id)
        .bind(trainer_id)
        .fetch_one(&self.db)
        .await?;
        if !trained_with {
            return Err(AppError::rejected(
                "Feedback requires a completed session with this trainer",
            ));
        }

        let feedback = sqlx::query_as::<_, TrainerFeedback>(
            r#"
            INSERT INTO feedback (user_id, trainer_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, trainer_id)
            DO UPDATE SET rating = EXCLUDED.rating, comment = EXCLUDED.comment, created_at = NOW()
            RETURNING id, user_id, trainer_id, rating, comment, created_at
            "#,
        )
        .bind(user_id)
        .bind(trainer_id)
        .bind(request.rating)
        .bind(request.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()))
        .fetch_one(&self.db)
        .await?;

        info!(%user_id, %trainer_id, rating = feedback.rating, "Trainer feedback recorded");
        Ok(feedback)
    }

    pub async fn list_gym_feedback(&self, limit: Option<i64>, offset: Option<i64>) -> AppResult<Vec<GymFeedbackEntry>> {
        let entries = sqlx::query_as::<_, GymFeedbackEntry>(
            r#"
            SELECT f.id, f.user_id, f.rating, f.category, f.message, f.created_at, u.full_name AS member_name
            FROM gym_feedback f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page_limit(limit))
        .bind(page_offset(offset))
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
