use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    page_limit, page_offset, Audience, BroadcastResult, NotificationKind, NotificationQuery,
    UserNotification,
};

/// In-app notifications. Each notification has one row per recipient in `user_notifications`.
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

/// Insert a notification for one user on an existing connection, so callers can
/// keep it inside their transaction. Returns `None` when `dedupe_key` was already used.
pub async fn notify_on(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: NotificationKind,
    title: &str,
    message: &str,
    dedupe_key: Option<&str>,
) -> AppResult<Option<Uuid>> {
    let id: Option<Uuid> = sqlx::query_scalar(
        r#"
        WITH inserted AS (
            INSERT INTO notifications (title, message, kind, dedupe_key)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (dedupe_key) DO NOTHING
            RETURNING id
        )
        INSERT INTO user_notifications (notification_id, user_id)
        SELECT id, $5 FROM inserted
        ON CONFLICT DO NOTHING
        RETURNING notification_id
        "#,
    )
    .bind(title)
    .bind(message)
    .bind(kind)
    .bind(dedupe_key)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn broadcast(
        &self,
        admin_id: Uuid,
        audience: Audience,
        title: &str,
        message: &str,
    ) -> AppResult<BroadcastResult> {
        let mut tx = self.db.begin().await?;

        let notification_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (title, message, kind, created_by)
            VALUES ($1, $2, 'announcement', $3)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(message)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        let fan_out = match audience {
            Audience::All => sqlx::query(
                r#"
                INSERT INTO user_notifications (notification_id, user_id)
                SELECT $1, id FROM users WHERE is_active
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(notification_id),
            Audience::Members => sqlx::query(
                r#"
                INSERT INTO user_notifications (notification_id, user_id)
                SELECT $1, id FROM users WHERE is_active AND role = 'member'
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(notification_id),
            Audience::Trainers => sqlx::query(
                r#"
                INSERT INTO user_notifications (notification_id, user_id)
                SELECT $1, id FROM users WHERE is_active AND role = 'trainer'
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(notification_id),
            Audience::User(user_id) => sqlx::query(
                r#"
                INSERT INTO user_notifications (notification_id, user_id)
                SELECT $1, id FROM users WHERE id = $2
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(notification_id)
            .bind(user_id),
        };

        let recipients = fan_out.execute(&mut *tx).await?.rows_affected();
        tx.commit().await?;

        info!(%notification_id, ?audience, recipients, "Broadcast notification sent");
        Ok(BroadcastResult { notification_id, recipients })
    }

    pub async fn list(&self, user_id: Uuid, query: &NotificationQuery) -> AppResult<Vec<UserNotification>> {
        let notifications = sqlx::query_as::<_, UserNotification>(
            r#"
            SELECT n.id, n.kind, n.title, n.message, n.created_at, un.read_at
            FROM user_notifications un
            JOIN notifications n ON n.id = un.notification_id
            WHERE un.user_id = $1 AND (NOT $2 OR un.read_at IS NULL)
            ORDER BY n.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(query.unread_only.unwrap_or(false))
        .bind(page_limit(query.limit))
        .bind(page_offset(query.offset))
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Returns false when the notification does not belong to the user.
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_notifications
            SET read_at = COALESCE(read_at, NOW())
            WHERE user_id = $1 AND notification_id = $2
            "#,
        )
        .bind(user_id)
        .bind(notification_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE user_notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
