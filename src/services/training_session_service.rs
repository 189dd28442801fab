use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::auth::UserSession;
use crate::error::{AppError, AppResult};
use crate::models::{
    BookSessionRequest, NotificationKind, SessionStatus, Trainer, TrainingSession, TrainingSessionDetails,
    TRAINER_COLUMNS, TRAINING_SESSION_COLUMNS,
};
use crate::services::membership_service::membership_state;
use crate::services::notification_service::notify_on;

const DETAILS_QUERY: &str = r#"
    SELECT s.id, s.trainer_id, t.full_name AS trainer_name, s.member_id, u.full_name AS member_name,
           s.scheduled_at, s.duration_minutes, s.status, s.notes
    FROM training_sessions s
    JOIN trainers t ON t.id = s.trainer_id
    JOIN users u ON u.id = s.member_id
"#;

#[derive(Clone)]
pub struct TrainingSessionService {
    db: PgPool,
}

impl TrainingSessionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Book a one-to-one session with a trainer.
    pub async fn book(&self, member_id: Uuid, request: BookSessionRequest) -> AppResult<TrainingSession> {
        let now = Utc::now();
        request.validate(now)?;

        let mut tx = self.db.begin().await?;

        // locking the trainer row serialises concurrent bookings for the same trainer
        let trainer = sqlx::query_as::<_, Trainer>(&format!(
            "SELECT {TRAINER_COLUMNS} FROM trainers WHERE id = $1 FOR UPDATE"
        ))
        .bind(request.trainer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Trainer"))?;

        if !trainer.is_active {
            return Err(AppError::rejected("Trainer is not available for booking"));
        }

        let (_, state) = membership_state(&mut tx, member_id, now.date_naive()).await?;
        if !state.is_active() {
            return Err(AppError::rejected(state.inactive_reason()));
        }

        let overlaps: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM training_sessions
                WHERE trainer_id = $1
                  AND status = 'scheduled'
                  AND scheduled_at < $2 + make_interval(mins => $3)
                  AND scheduled_at + make_interval(mins => duration_minutes) > $2
            )
            "#,
        )
        .bind(trainer.id)
        .bind(request.scheduled_at)
        .bind(request.duration_minutes)
        .fetch_one(&mut *tx)
        .await?;

        if overlaps {
            return Err(AppError::conflict("Trainer is already booked for that time"));
        }

        let session = sqlx::query_as::<_, TrainingSession>(&format!(
            r#"
            INSERT INTO training_sessions (trainer_id, member_id, scheduled_at, duration_minutes, status, notes)
            VALUES ($1, $2, $3, $4, 'scheduled', $5)
            RETURNING {TRAINING_SESSION_COLUMNS}
            "#
        ))
        .bind(trainer.id)
        .bind(member_id)
        .bind(request.scheduled_at)
        .bind(request.duration_minutes)
        .bind(request.notes)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(trainer_user) = trainer.user_id {
            notify_on(
                &mut tx,
                trainer_user,
                NotificationKind::Booking,
                "New session booked",
                &format!(
                    "A member booked a {}-minute session on {}.",
                    session.duration_minutes,
                    session.scheduled_at.format("%Y-%m-%d %H:%M UTC")
                ),
                None,
            )
            .await?;
        }

        tx.commit().await?;

        info!(session_id = %session.id, trainer_id = %trainer.id, %member_id, "Training session booked");
        Ok(session)
    }

    pub async fn list_for_member(&self, member_id: Uuid) -> AppResult<Vec<TrainingSessionDetails>> {
        let sessions = sqlx::query_as::<_, TrainingSessionDetails>(&format!(
            "{DETAILS_QUERY} WHERE s.member_id = $1 ORDER BY s.scheduled_at DESC"
        ))
        .bind(member_id)
        .fetch_all(&self.db)
        .await?;

        Ok(sessions)
    }

    /// Sessions of the trainer linked to `user_id`.
    pub async fn list_for_trainer(&self, user_id: Uuid) -> AppResult<Vec<TrainingSessionDetails>> {
        let sessions = sqlx::query_as::<_, TrainingSessionDetails>(&format!(
            "{DETAILS_QUERY} WHERE t.user_id = $1 ORDER BY s.scheduled_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(sessions)
    }

    pub async fn cancel(&self, session_id: Uuid, actor: &UserSession) -> AppResult<TrainingSession> {
        let mut tx = self.db.begin().await?;

        let (session, trainer_user) = Self::lock_session(&mut tx, session_id).await?;

        let is_member = session.member_id == actor.user_id;
        let is_trainer = trainer_user == Some(actor.user_id);
        if !(is_member || is_trainer || actor.is_admin()) {
            return Err(AppError::Forbidden);
        }
        session.ensure_cancellable()?;

        let session = Self::set_status(&mut tx, session.id, SessionStatus::Cancelled).await?;

        let message = format!(
            "The session on {} has been cancelled.",
            session.scheduled_at.format("%Y-%m-%d %H:%M UTC")
        );
        if !is_member {
            notify_on(&mut tx, session.member_id, NotificationKind::Booking, "Session cancelled", &message, None)
                .await?;
        }
        if let (Some(trainer_user), false) = (trainer_user, is_trainer) {
            notify_on(&mut tx, trainer_user, NotificationKind::Booking, "Session cancelled", &message, None).await?;
        }

        tx.commit().await?;

        info!(%session_id, actor = %actor.user_id, "Training session cancelled");
        Ok(session)
    }

    pub async fn complete(&self, session_id: Uuid, actor: &UserSession) -> AppResult<TrainingSession> {
        let mut tx = self.db.begin().await?;

        let (session, trainer_user) = Self::lock_session(&mut tx, session_id).await?;

        if trainer_user != Some(actor.user_id) && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        session.ensure_completable(Utc::now())?;

        let session = Self::set_status(&mut tx, session.id, SessionStatus::Completed).await?;
        tx.commit().await?;

        info!(%session_id, actor = %actor.user_id, "Training session completed");
        Ok(session)
    }

    async fn lock_session(conn: &mut PgConnection, session_id: Uuid) -> AppResult<(TrainingSession, Option<Uuid>)> {
        let session = sqlx::query_as::<_, TrainingSession>(&format!(
            "SELECT {TRAINING_SESSION_COLUMNS} FROM training_sessions WHERE id = $1 FOR UPDATE"
        ))
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Session"))?;

        let trainer_user: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM trainers WHERE id = $1")
            .bind(session.trainer_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok((session, trainer_user))
    }

    async fn set_status(conn: &mut PgConnection, session_id: Uuid, status: SessionStatus) -> AppResult<TrainingSession> {
        let session = sqlx::query_as::<_, TrainingSession>(&format!(
            r#"
            UPDATE training_sessions SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TRAINING_SESSION_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(status)
        .fetch_one(&mut *conn)
        .await?;

        Ok(session)
    }
}
