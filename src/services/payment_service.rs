use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    activation_window, ensure_payable_plan, ensure_within_balance, format_cents, page_limit, page_offset,
    MemberPlanStatus, NotificationKind, Payment, PaymentQuery, PaymentReview, PaymentStatus,
    SubmitPaymentRequest, PAYMENT_COLUMNS,
};
use crate::services::notification_service::notify_on;

/// Outcome of an admin review.
#[derive(Debug, Serialize)]
pub struct PaymentDecision {
    pub payment: Payment,
    pub plan_activated: bool,
}

#[derive(Clone)]
pub struct PaymentService {
    db: PgPool,
}

impl PaymentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a member payment against their outstanding balance. Stays pending until reviewed.
    pub async fn submit_payment(&self, user_id: Uuid, request: SubmitPaymentRequest) -> AppResult<Payment> {
        request.validate()?;

        let mut tx = self.db.begin().await?;

        let balance_cents: i64 = sqlx::query_scalar("SELECT balance_cents FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        ensure_within_balance(request.amount_cents, balance_cents)?;

        let plan_status: MemberPlanStatus = sqlx::query_scalar(
            "SELECT status FROM member_plans WHERE id = $1 AND user_id = $2",
        )
        .bind(request.member_plan_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Membership"))?;

        let awaiting_payment: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM member_plans WHERE user_id = $1 AND status = 'pending' ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        ensure_payable_plan(request.member_plan_id, plan_status, awaiting_payment)?;

        sqlx::query("UPDATE users SET balance_cents = balance_cents - $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(request.amount_cents)
            .execute(&mut *tx)
            .await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payment_history (user_id, member_plan_id, amount_cents, payment_method, reference, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(request.member_plan_id)
        .bind(request.amount_cents)
        .bind(request.payment_method)
        .bind(request.reference.as_deref().map(str::trim).filter(|r| !r.is_empty()))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(%user_id, payment_id = %payment.id, amount_cents = payment.amount_cents, "Payment submitted");
        Ok(payment)
    }

    pub async fn payment_history(&self, user_id: Uuid) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(payments)
    }

    pub async fn list_payments(&self, query: &PaymentQuery) -> AppResult<Vec<PaymentReview>> {
        let payments = sqlx::query_as::<_, PaymentReview>(
            r#"
            SELECT ph.id, ph.user_id, u.full_name AS member_name, u.email AS member_email,
                   mp_plan.name AS plan_name, mp_plan.price_cents AS plan_price_cents,
                   ph.amount_cents, ph.payment_method, ph.reference, ph.status, ph.created_at
            FROM payment_history ph
            JOIN users u ON u.id = ph.user_id
            JOIN member_plans mp ON mp.id = ph.member_plan_id
            JOIN membership_plans mp_plan ON mp_plan.id = mp.plan_id
            WHERE $1::payment_status IS NULL OR ph.status = $1
            ORDER BY ph.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query.status)
        .bind(page_limit(query.limit))
        .bind(page_offset(query.offset))
        .fetch_all(&self.db)
        .await?;

        Ok(payments)
    }

    /// Approve a pending payment, activating the plan once it is paid in full.
    ///
    /// An activated plan always starts today. Any plan the member still holds is expired in
    /// the same transaction, so days left on a renewed plan are not carried over.
    pub async fn approve(&self, payment_id: Uuid, admin_id: Uuid) -> AppResult<PaymentDecision> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.begin().await?;

        let payment = self.lock_pending(&mut tx, payment_id).await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payment_history
            SET status = 'approved', reviewed_by = $2, reviewed_at = NOW()
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.id)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        let (plan_status, price_cents, duration_days, plan_name): (MemberPlanStatus, i64, i32, String) =
            sqlx::query_as(
                r#"
                SELECT mp.status, p.price_cents, p.duration_days, p.name
                FROM member_plans mp
                JOIN membership_plans p ON p.id = mp.plan_id
                WHERE mp.id = $1
                FOR UPDATE OF mp
                "#,
            )
            .bind(payment.member_plan_id)
            .fetch_one(&mut *tx)
            .await?;

        let approved_total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)::BIGINT
            FROM payment_history
            WHERE member_plan_id = $1 AND status = 'approved'
            "#,
        )
        .bind(payment.member_plan_id)
        .fetch_one(&mut *tx)
        .await?;

        let plan_activated = plan_status == MemberPlanStatus::Pending && approved_total >= price_cents;

        if plan_activated {
            sqlx::query(
                r#"
                UPDATE member_plans SET status = 'expired', updated_at = NOW()
                WHERE user_id = $1 AND id <> $2 AND status IN ('active', 'frozen')
                "#,
            )
            .bind(payment.user_id)
            .bind(payment.member_plan_id)
            .execute(&mut *tx)
            .await?;

            let (start_date, end_date) = activation_window(today, duration_days);
            sqlx::query(
                r#"
                UPDATE member_plans
                SET status = 'active', start_date = $2, end_date = $3, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(payment.member_plan_id)
            .bind(start_date)
            .bind(end_date)
            .execute(&mut *tx)
            .await?;

            notify_on(
                &mut tx,
                payment.user_id,
                NotificationKind::Membership,
                "Membership activated",
                &format!("Your {} membership is active until {}.", plan_name, end_date),
                None,
            )
            .await?;
        }

        notify_on(
            &mut tx,
            payment.user_id,
            NotificationKind::Payment,
            "Payment approved",
            &format!("Your payment of {} has been approved.", format_cents(payment.amount_cents)),
            None,
        )
        .await?;

        tx.commit().await?;

        info!(%payment_id, %admin_id, plan_activated, "Payment approved");
        Ok(PaymentDecision { payment, plan_activated })
    }

    /// Reject a pending payment and put the amount back on the member's balance.
    pub async fn reject(&self, payment_id: Uuid, admin_id: Uuid, reason: Option<String>) -> AppResult<PaymentDecision> {
        let mut tx = self.db.begin().await?;

        let payment = self.lock_pending(&mut tx, payment_id).await?;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payment_history
            SET status = 'rejected', reviewed_by = $2, reviewed_at = NOW(), rejection_reason = $3
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.id)
        .bind(admin_id)
        .bind(reason.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET balance_cents = balance_cents + $2, updated_at = NOW() WHERE id = $1")
            .bind(payment.user_id)
            .bind(payment.amount_cents)
            .execute(&mut *tx)
            .await?;

        let message = match &reason {
            Some(reason) => format!(
                "Your payment of {} was rejected: {}",
                format_cents(payment.amount_cents),
                reason
            ),
            None => format!("Your payment of {} was rejected.", format_cents(payment.amount_cents)),
        };
        notify_on(&mut tx, payment.user_id, NotificationKind::Payment, "Payment rejected", &message, None).await?;

        tx.commit().await?;

        info!(%payment_id, %admin_id, "Payment rejected");
        Ok(PaymentDecision {
            payment,
            plan_activated: false,
        })
    }

    async fn lock_pending(&self, conn: &mut sqlx::PgConnection, payment_id: Uuid) -> AppResult<Payment> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_history WHERE id = $1 FOR UPDATE"
        ))
        .bind(payment_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

        if payment.status != PaymentStatus::Pending {
            return Err(AppError::conflict("Payment has already been reviewed"));
        }
        Ok(payment)
    }
}
