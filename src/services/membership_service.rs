use chrono::{Duration, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ensure_can_select_plan, CreatePlanRequest, FreezeRequest, MemberPlan, MemberPlanStatus,
    MembershipOverview, MembershipPlan, MembershipState, UpdatePlanRequest, MEMBER_PLAN_COLUMNS,
};

const PLAN_COLUMNS: &str = "id, name, description, price_cents, duration_days, is_active, created_at";

/// Orders a member's plans so the one that currently governs access comes first.
const CURRENT_PLAN_ORDER: &str = "ORDER BY CASE status WHEN 'active' THEN 0 WHEN 'frozen' THEN 0 \
     WHEN 'pending' THEN 1 ELSE 2 END, created_at DESC LIMIT 1";

/// Load the plan that governs a member's access right now.
pub async fn current_member_plan(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<MemberPlan>> {
    let plan = sqlx::query_as::<_, MemberPlan>(&format!(
        "SELECT {MEMBER_PLAN_COLUMNS} FROM member_plans WHERE user_id = $1 {CURRENT_PLAN_ORDER}"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(plan)
}

/// Effective membership state of a member on `today`.
pub async fn membership_state(
    conn: &mut PgConnection,
    user_id: Uuid,
    today: NaiveDate,
) -> AppResult<(Option<MemberPlan>, MembershipState)> {
    let plan = current_member_plan(conn, user_id).await?;
    let state = plan
        .as_ref()
        .map(|p| p.state_on(today))
        .unwrap_or(MembershipState::None);
    Ok((plan, state))
}

#[derive(Clone)]
pub struct MembershipService {
    db: PgPool,
    max_freeze_days: i64,
}

impl MembershipService {
    pub fn new(db: PgPool, max_freeze_days: i64) -> Self {
        Self { db, max_freeze_days }
    }

    pub async fn list_plans(&self, include_inactive: bool) -> AppResult<Vec<MembershipPlan>> {
        let plans = sqlx::query_as::<_, MembershipPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM membership_plans WHERE is_active OR $1 ORDER BY price_cents"
        ))
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(plans)
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> AppResult<MembershipPlan> {
        sqlx::query_as::<_, MembershipPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM membership_plans WHERE id = $1"
        ))
        .bind(plan_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Plan"))
    }

    pub async fn create_plan(&self, request: CreatePlanRequest) -> AppResult<MembershipPlan> {
        let plan = sqlx::query_as::<_, MembershipPlan>(&format!(
            r#"
            INSERT INTO membership_plans (name, description, price_cents, duration_days)
            VALUES ($1, $2, $3, $4)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(request.name.trim())
        .bind(request.description)
        .bind(request.price_cents)
        .bind(request.duration_days)
        .fetch_one(&self.db)
        .await?;

        info!(plan_id = %plan.id, name = %plan.name, "Membership plan created");
        Ok(plan)
    }

    pub async fn update_plan(&self, plan_id: Uuid, request: UpdatePlanRequest) -> AppResult<MembershipPlan> {
        sqlx::query_as::<_, MembershipPlan>(&format!(
            r#"
            UPDATE membership_plans
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                duration_days = COALESCE($5, duration_days),
                is_active = COALESCE($6, is_active)
            WHERE id = $1
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(plan_id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.description)
        .bind(request.price_cents)
        .bind(request.duration_days)
        .bind(request.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Plan"))
    }

    pub async fn current_membership(&self, user_id: Uuid) -> AppResult<MembershipOverview> {
        let mut conn = self.db.acquire().await?;
        let today = Utc::now().date_naive();

        let (member_plan, state) = membership_state(&mut conn, user_id, today).await?;

        let plan = match &member_plan {
            Some(mp) => Some(
                sqlx::query_as::<_, MembershipPlan>(&format!(
                    "SELECT {PLAN_COLUMNS} FROM membership_plans WHERE id = $1"
                ))
                .bind(mp.plan_id)
                .fetch_one(&mut *conn)
                .await?,
            ),
            None => None,
        };

        let balance_cents: i64 = sqlx::query_scalar("SELECT balance_cents FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        Ok(MembershipOverview {
            member_plan,
            plan,
            state,
            balance_cents,
        })
    }

    /// Start a new pending plan and charge its price to the member's balance.
    pub async fn select_plan(&self, user_id: Uuid, plan_id: Uuid) -> AppResult<MemberPlan> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.begin().await?;

        // serialises concurrent selections by the same member
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let plan = sqlx::query_as::<_, MembershipPlan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM membership_plans WHERE id = $1"
        ))
        .bind(plan_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|plan| plan.is_active)
        .ok_or_else(|| AppError::not_found("Plan"))?;

        let has_pending: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM member_plans WHERE user_id = $1 AND status = 'pending')",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if has_pending {
            return Err(AppError::conflict("A plan is already awaiting payment"));
        }

        let current = current_member_plan(&mut tx, user_id).await?;
        ensure_can_select_plan(current.as_ref(), today)?;

        let member_plan = sqlx::query_as::<_, MemberPlan>(&format!(
            r#"
            INSERT INTO member_plans (user_id, plan_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING {MEMBER_PLAN_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(plan.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET balance_cents = balance_cents + $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(plan.price_cents)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(%user_id, plan = %plan.name, member_plan_id = %member_plan.id, "Plan selected");
        Ok(member_plan)
    }

    pub async fn freeze(&self, user_id: Uuid, request: FreezeRequest) -> AppResult<MemberPlan> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.begin().await?;

        let plan = Self::lock_current_plan(&mut tx, user_id).await?;
        let length = plan.validate_freeze(request.start_date, request.end_date, today, self.max_freeze_days)?;

        let end_date = plan
            .end_date
            .map(|end| end + Duration::days(length))
            .ok_or_else(|| AppError::rejected("Membership has no end date"))?;
        let status = if request.start_date <= today {
            MemberPlanStatus::Frozen
        } else {
            plan.status
        };

        let frozen = sqlx::query_as::<_, MemberPlan>(&format!(
            r#"
            UPDATE member_plans
            SET freeze_start = $2, freeze_end = $3, end_date = $4, status = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {MEMBER_PLAN_COLUMNS}
            "#
        ))
        .bind(plan.id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(end_date)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            %user_id,
            member_plan_id = %frozen.id,
            start = %request.start_date,
            end = %request.end_date,
            reason = request.reason.as_deref().unwrap_or(""),
            "Membership freeze scheduled"
        );
        Ok(frozen)
    }

    pub async fn cancel_freeze(&self, user_id: Uuid) -> AppResult<MemberPlan> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.begin().await?;

        let plan = Self::lock_current_plan(&mut tx, user_id).await?;
        let days = plan.validate_cancel_freeze(today)?;

        let end_date = plan.end_date.map(|end| end - Duration::days(days));

        let restored = sqlx::query_as::<_, MemberPlan>(&format!(
            r#"
            UPDATE member_plans
            SET freeze_start = NULL, freeze_end = NULL, end_date = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {MEMBER_PLAN_COLUMNS}
            "#
        ))
        .bind(plan.id)
        .bind(end_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(%user_id, member_plan_id = %restored.id, "Membership freeze cancelled");
        Ok(restored)
    }

    async fn lock_current_plan(conn: &mut PgConnection, user_id: Uuid) -> AppResult<MemberPlan> {
        sqlx::query_as::<_, MemberPlan>(&format!(
            r#"
            SELECT {MEMBER_PLAN_COLUMNS} FROM member_plans
            WHERE user_id = $1 AND status IN ('active', 'frozen')
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#
        ))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::rejected(MembershipState::None.inactive_reason()))
    }
}
