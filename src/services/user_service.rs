use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::auth::{UserInfo, UserRole};
use crate::error::{AppError, AppResult};
use crate::models::{page_limit, page_offset, MemberQuery, MemberSummary, User, USER_COLUMNS};

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DashboardStats {
    pub total_members: i64,
    pub active_memberships: i64,
    pub pending_payments: i64,
    pub check_ins_today: i64,
    pub revenue_this_month_cents: i64,
    pub upcoming_classes: i64,
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Admin-side user management.
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

impl UserService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_members(&self, query: &MemberQuery) -> AppResult<Vec<MemberSummary>> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let members = sqlx::query_as::<_, MemberSummary>(
            r#"
            SELECT u.id, u.email, u.full_name, u.phone, u.role, u.balance_cents, u.is_active,
                   latest.plan_name, latest.plan_status, latest.plan_end_date, u.created_at
            FROM users u
            LEFT JOIN LATERAL (
                SELECT p.name AS plan_name, mp.status::TEXT AS plan_status, mp.end_date AS plan_end_date
                FROM member_plans mp
                JOIN membership_plans p ON p.id = mp.plan_id
                WHERE mp.user_id = u.id
                ORDER BY mp.created_at DESC
                LIMIT 1
            ) latest ON TRUE
            WHERE ($1::user_role IS NULL OR u.role = $1)
              AND ($2::TEXT IS NULL OR lower(u.email) LIKE $2 OR lower(u.full_name) LIKE $2)
            ORDER BY u.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.role)
        .bind(search)
        .bind(page_limit(query.limit))
        .bind(page_offset(query.offset))
        .fetch_all(&self.db)
        .await?;

        Ok(members)
    }

    pub async fn update_role(&self, admin_id: Uuid, user_id: Uuid, role: UserRole) -> AppResult<UserInfo> {
        if admin_id == user_id && role != UserRole::Admin {
            return Err(AppError::rejected("Admins cannot demote themselves"));
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(role)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

        info!(%user_id, role = role.as_str(), %admin_id, "User role updated");
        Ok(user.into())
    }

    /// Deactivating a user also revokes their refresh tokens.
    pub async fn set_active(&self, admin_id: Uuid, user_id: Uuid, is_active: bool) -> AppResult<UserInfo> {
        if admin_id == user_id && !is_active {
            return Err(AppError::rejected("Admins cannot deactivate themselves"));
        }

        let mut tx = self.db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

        if !is_active {
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(%user_id, is_active, %admin_id, "User active flag updated");
        Ok(user.into())
    }

    pub async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let today = Utc::now().date_naive();

        let stats = sqlx::query_as::<_, DashboardStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role = 'member') AS total_members,
                (SELECT COUNT(*) FROM member_plans
                  WHERE status = 'active' AND start_date <= $1 AND end_date >= $1) AS active_memberships,
                (SELECT COUNT(*) FROM payment_history WHERE status = 'pending') AS pending_payments,
                (SELECT COUNT(*) FROM attendance WHERE checked_in_at::DATE = $1) AS check_ins_today,
                (SELECT COALESCE(SUM(amount_cents), 0)::BIGINT FROM payment_history
                  WHERE status = 'approved' AND reviewed_at::DATE >= $2) AS revenue_this_month_cents,
                (SELECT COUNT(*) FROM classes WHERE NOT is_cancelled AND starts_at > NOW()) AS upcoming_classes
            "#,
        )
        .bind(today)
        .bind(month_start(today))
        .fetch_one(&self.db)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_start() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 17).unwrap();
        assert_eq!(month_start(date), NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }
}
