use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{CreateTrainerRequest, Trainer, TrainerProfile, UpdateTrainerRequest, TRAINER_COLUMNS};

fn profile_query(filter: &str) -> String {
    format!(
        r#"
        SELECT {TRAINER_COLUMNS},
               (SELECT AVG(f.rating)::FLOAT8 FROM feedback f WHERE f.trainer_id = trainers.id) AS average_rating,
               (SELECT COUNT(*) FROM feedback f WHERE f.trainer_id = trainers.id) AS feedback_count
        FROM trainers
        {filter}
        "#
    )
}

#[derive(Clone)]
pub struct TrainerService {
    db: PgPool,
}

impl TrainerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_trainers(&self, include_inactive: bool) -> AppResult<Vec<TrainerProfile>> {
        let trainers = sqlx::query_as::<_, TrainerProfile>(&profile_query(
            "WHERE is_active OR $1 ORDER BY full_name",
        ))
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(trainers)
    }

    pub async fn get_trainer(&self, trainer_id: Uuid) -> AppResult<TrainerProfile> {
        sqlx::query_as::<_, TrainerProfile>(&profile_query("WHERE id = $1"))
            .bind(trainer_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Trainer"))
    }

    /// Trainer record linked to a user account, if any.
    pub async fn trainer_for_user(&self, user_id: Uuid) -> AppResult<Option<Trainer>> {
        let trainer = sqlx::query_as::<_, Trainer>(&format!(
            "SELECT {TRAINER_COLUMNS} FROM trainers WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(trainer)
    }

    /// Create a trainer. A linked user account is promoted to the trainer role.
    pub async fn create_trainer(&self, request: CreateTrainerRequest) -> AppResult<Trainer> {
        request.validate()?;

        let mut tx = self.db.begin().await?;

        if let Some(user_id) = request.user_id {
            let promoted = sqlx::query(
                r#"
                UPDATE users SET role = 'trainer', updated_at = NOW()
                WHERE id = $1 AND role <> 'admin'
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

            if promoted.rows_affected() == 0 {
                let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await?;
                if !exists {
                    return Err(AppError::not_found("User"));
                }
            }
        }

        let trainer = sqlx::query_as::<_, Trainer>(&format!(
            r#"
            INSERT INTO trainers (user_id, full_name, specialization, bio, hourly_rate_cents)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TRAINER_COLUMNS}
            "#
        ))
        .bind(request.user_id)
        .bind(request.full_name.trim())
        .bind(request.specialization)
        .bind(request.bio)
        .bind(request.hourly_rate_cents)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(trainer_id = %trainer.id, name = %trainer.full_name, "Trainer created");
        Ok(trainer)
    }

    pub async fn update_trainer(&self, trainer_id: Uuid, request: UpdateTrainerRequest) -> AppResult<Trainer> {
        request.validate()?;

        sqlx::query_as::<_, Trainer>(&format!(
            r#"
            UPDATE trainers
            SET full_name = COALESCE($2, full_name),
                specialization = COALESCE($3, specialization),
                bio = COALESCE($4, bio),
                hourly_rate_cents = COALESCE($5, hourly_rate_cents),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TRAINER_COLUMNS}
            "#
        ))
        .bind(trainer_id)
        .bind(request.full_name.as_deref().map(str::trim))
        .bind(request.specialization)
        .bind(request.bio)
        .bind(request.hourly_rate_cents)
        .bind(request.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Trainer"))
    }

    /// Deactivated trainers cannot be booked; existing sessions are kept.
    pub async fn deactivate_trainer(&self, trainer_id: Uuid) -> AppResult<Trainer> {
        let trainer = sqlx::query_as::<_, Trainer>(&format!(
            r#"
            UPDATE trainers SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            RETURNING {TRAINER_COLUMNS}
            "#
        ))
        .bind(trainer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Trainer"))?;

        info!(%trainer_id, "Trainer deactivated");
        Ok(trainer)
    }
}
