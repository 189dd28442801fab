use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ClassEnrollment, ClassListing, CreateClassRequest, GymClass, CLASS_COLUMNS};

const LISTING_QUERY: &str = r#"
    SELECT c.id, c.name, c.description, c.trainer_id, c.starts_at, c.duration_minutes, c.capacity,
           c.is_cancelled, c.created_at,
           t.full_name AS trainer_name,
           (SELECT COUNT(*) FROM class_enrollments e WHERE e.class_id = c.id) AS enrolled_count
    FROM classes c
    LEFT JOIN trainers t ON t.id = c.trainer_id
"#;

#[derive(Clone)]
pub struct ClassService {
    db: PgPool,
}

impl ClassService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_upcoming(&self) -> AppResult<Vec<ClassListing>> {
        let classes = sqlx::query_as::<_, ClassListing>(&format!(
            "{LISTING_QUERY} WHERE NOT c.is_cancelled AND c.starts_at > NOW() ORDER BY c.starts_at"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(classes)
    }

    /// Every class, including past and cancelled ones.
    pub async fn list_all(&self) -> AppResult<Vec<ClassListing>> {
        let classes = sqlx::query_as::<_, ClassListing>(&format!("{LISTING_QUERY} ORDER BY c.starts_at DESC"))
            .fetch_all(&self.db)
            .await?;

        Ok(classes)
    }

    pub async fn list_enrolled(&self, user_id: Uuid) -> AppResult<Vec<ClassListing>> {
        let classes = sqlx::query_as::<_, ClassListing>(&format!(
            r#"
            {LISTING_QUERY}
            WHERE EXISTS (SELECT 1 FROM class_enrollments e WHERE e.class_id = c.id AND e.user_id = $1)
            ORDER BY c.starts_at
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(classes)
    }

    pub async fn enroll(&self, user_id: Uuid, class_id: Uuid) -> AppResult<ClassEnrollment> {
        let mut tx = self.db.begin().await?;

        let class = sqlx::query_as::<_, GymClass>(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1 FOR UPDATE"
        ))
        .bind(class_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Class"))?;

        let already_enrolled: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM class_enrollments WHERE class_id = $1 AND user_id = $2)",
        )
        .bind(class_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_enrolled {
            return Err(AppError::conflict("Already enrolled in this class"));
        }

        let enrolled: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM class_enrollments WHERE class_id = $1")
            .bind(class_id)
            .fetch_one(&mut *tx)
            .await?;

        class.ensure_open_for_enrollment(enrolled, Utc::now())?;

        let enrollment = sqlx::query_as::<_, ClassEnrollment>(
            r#"
            INSERT INTO class_enrollments (class_id, user_id)
            VALUES ($1, $2)
            RETURNING id, class_id, user_id, enrolled_at
            "#,
        )
        .bind(class_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::conflict("Already enrolled in this class"),
            other => other,
        })?;

        tx.commit().await?;

        info!(%class_id, %user_id, "Class enrollment created");
        Ok(enrollment)
    }

    pub async fn unenroll(&self, user_id: Uuid, class_id: Uuid) -> AppResult<()> {
        let starts_at: chrono::DateTime<Utc> = sqlx::query_scalar("SELECT starts_at FROM classes WHERE id = $1")
            .bind(class_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Class"))?;

        if starts_at <= Utc::now() {
            return Err(AppError::rejected("Class has already started"));
        }

        let result = sqlx::query("DELETE FROM class_enrollments WHERE class_id = $1 AND user_id = $2")
            .bind(class_id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Enrollment"));
        }

        info!(%class_id, %user_id, "Class enrollment removed");
        Ok(())
    }

    pub async fn create_class(&self, request: CreateClassRequest) -> AppResult<GymClass> {
        request.validate()?;
        if request.starts_at <= Utc::now() {
            return Err(AppError::validation("Classes must be scheduled in the future"));
        }

        let class = sqlx::query_as::<_, GymClass>(&format!(
            r#"
            INSERT INTO classes (name, description, trainer_id, starts_at, duration_minutes, capacity)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CLASS_COLUMNS}
            "#
        ))
        .bind(request.name.trim())
        .bind(request.description)
        .bind(request.trainer_id)
        .bind(request.starts_at)
        .bind(request.duration_minutes)
        .bind(request.capacity)
        .fetch_one(&self.db)
        .await?;

        info!(class_id = %class.id, name = %class.name, "Class created");
        Ok(class)
    }

    /// Cancel a class and tell everyone enrolled. Returns the number of members notified.
    pub async fn cancel_class(&self, class_id: Uuid, admin_id: Uuid) -> AppResult<(GymClass, u64)> {
        let mut tx = self.db.begin().await?;

        let class = sqlx::query_as::<_, GymClass>(&format!(
            r#"
            UPDATE classes SET is_cancelled = TRUE
            WHERE id = $1 AND NOT is_cancelled
            RETURNING {CLASS_COLUMNS}
            "#
        ))
        .bind(class_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(class) = class else {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM classes WHERE id = $1)")
                .bind(class_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                AppError::conflict("Class is already cancelled")
            } else {
                AppError::not_found("Class")
            });
        };

        let notification_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (title, message, kind, created_by)
            VALUES ($1, $2, 'class', $3)
            RETURNING id
            "#,
        )
        .bind("Class cancelled")
        .bind(format!(
            "{} on {} has been cancelled.",
            class.name,
            class.starts_at.format("%Y-%m-%d %H:%M UTC")
        ))
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        let notified = sqlx::query(
            r#"
            INSERT INTO user_notifications (notification_id, user_id)
            SELECT $1, user_id FROM class_enrollments WHERE class_id = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(notification_id)
        .bind(class_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        info!(%class_id, notified, "Class cancelled");
        Ok((class, notified))
    }
}
