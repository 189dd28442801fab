use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    page_limit, page_offset, LogWorkoutRequest, MemberProgress, RecordProgressRequest, WorkoutPerformance,
    WorkoutSummary,
};

const PROGRESS_COLUMNS: &str =
    "id, user_id, recorded_on, weight_kg, body_fat_pct, chest_cm, waist_cm, notes, created_at";
const WORKOUT_COLUMNS: &str =
    "id, user_id, performed_on, exercise, sets, reps, weight_kg, duration_minutes, notes, created_at";

#[derive(Clone)]
pub struct ProgressService {
    db: PgPool,
}

impl ProgressService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn record_progress(&self, user_id: Uuid, request: RecordProgressRequest) -> AppResult<MemberProgress> {
        let today = Utc::now().date_naive();
        request.validate(today)?;

        let progress = sqlx::query_as::<_, MemberProgress>(&format!(
            r#"
            INSERT INTO member_progress (user_id, recorded_on, weight_kg, body_fat_pct, chest_cm, waist_cm, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PROGRESS_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(request.recorded_on.unwrap_or(today))
        .bind(request.weight_kg)
        .bind(request.body_fat_pct)
        .bind(request.chest_cm)
        .bind(request.waist_cm)
        .bind(request.notes)
        .fetch_one(&self.db)
        .await?;

        info!(%user_id, progress_id = %progress.id, "Progress recorded");
        Ok(progress)
    }

    pub async fn progress_history(&self, user_id: Uuid) -> AppResult<Vec<MemberProgress>> {
        let entries = sqlx::query_as::<_, MemberProgress>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM member_progress WHERE user_id = $1 ORDER BY recorded_on DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    pub async fn log_workout(&self, user_id: Uuid, request: LogWorkoutRequest) -> AppResult<WorkoutPerformance> {
        let today = Utc::now().date_naive();
        request.validate(today)?;

        let workout = sqlx::query_as::<_, WorkoutPerformance>(&format!(
            r#"
            INSERT INTO workout_performance
                (user_id, performed_on, exercise, sets, reps, weight_kg, duration_minutes, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {WORKOUT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(request.performed_on.unwrap_or(today))
        .bind(request.exercise.trim())
        .bind(request.sets)
        .bind(request.reps)
        .bind(request.weight_kg)
        .bind(request.duration_minutes)
        .bind(request.notes)
        .fetch_one(&self.db)
        .await?;

        info!(%user_id, exercise = %workout.exercise, "Workout logged");
        Ok(workout)
    }

    pub async fn workout_history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> AppResult<Vec<WorkoutPerformance>> {
        let workouts = sqlx::query_as::<_, WorkoutPerformance>(&format!(
            r#"
            SELECT {WORKOUT_COLUMNS} FROM workout_performance
            WHERE user_id = $1
            ORDER BY performed_on DESC, created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page_limit(limit))
        .bind(page_offset(offset))
        .fetch_all(&self.db)
        .await?;

        Ok(workouts)
    }

    pub async fn workout_summary(&self, user_id: Uuid) -> AppResult<WorkoutSummary> {
        let summary = sqlx::query_as::<_, WorkoutSummary>(
            r#"
            SELECT COUNT(*) AS total_workouts,
                   COALESCE(SUM(sets), 0)::BIGINT AS total_sets,
                   COALESCE(SUM(sets * reps * COALESCE(weight_kg, 0)), 0)::FLOAT8 AS total_volume_kg,
                   COUNT(DISTINCT lower(exercise)) AS distinct_exercises,
                   MAX(performed_on) AS last_workout_on
            FROM workout_performance
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(summary)
    }
}
