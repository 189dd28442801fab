use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    evaluate_check_in, page_limit, page_offset, Attendance, AttendanceEntry, CheckInMethod, CheckInResult,
};
use crate::services::membership_service::membership_state;
use crate::services::qr_service::QrSigner;

const ATTENDANCE_COLUMNS: &str = "id, user_id, member_plan_id, checked_in_at, method, recorded_by";

#[derive(Clone)]
pub struct AttendanceService {
    db: PgPool,
    signer: QrSigner,
    cooldown: Duration,
}

impl AttendanceService {
    pub fn new(db: PgPool, signer: QrSigner, cooldown_minutes: i64) -> Self {
        Self {
            db,
            signer,
            cooldown: Duration::minutes(cooldown_minutes),
        }
    }

    pub fn signer(&self) -> &QrSigner {
        &self.signer
    }

    /// Check a member in from a scanned QR payload.
    pub async fn check_in(&self, raw_payload: &str, staff_id: Uuid) -> AppResult<CheckInResult> {
        let today = Utc::now().date_naive();
        let payload = self.signer.verify(raw_payload, today).map_err(|e| {
            warn!(%staff_id, reason = %e, "QR check-in refused");
            AppError::from(e)
        })?;

        self.record(payload.member_id, staff_id, CheckInMethod::Qr).await
    }

    /// Front-desk check-in without a QR code. Same rules as a scan.
    pub async fn manual_check_in(&self, user_id: Uuid, staff_id: Uuid) -> AppResult<CheckInResult> {
        self.record(user_id, staff_id, CheckInMethod::Manual).await
    }

    async fn record(&self, user_id: Uuid, staff_id: Uuid, method: CheckInMethod) -> AppResult<CheckInResult> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // the member row lock keeps two desks from checking the same member in at once
        let (member_name, is_active): (String, bool) =
            sqlx::query_as("SELECT full_name, is_active FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::not_found("Member"))?;

        if !is_active {
            return Err(AppError::rejected("Member account is disabled"));
        }

        let (member_plan, state) = membership_state(&mut tx, user_id, now.date_naive()).await?;

        let last_check_in: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT MAX(checked_in_at) FROM attendance WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;

        evaluate_check_in(&state, last_check_in, now, self.cooldown)?;

        let attendance = sqlx::query_as::<_, Attendance>(&format!(
            r#"
            INSERT INTO attendance (user_id, member_plan_id, checked_in_at, method, recorded_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ATTENDANCE_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(member_plan.as_ref().map(|p| p.id))
        .bind(now)
        .bind(method)
        .bind(staff_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(%user_id, %staff_id, ?method, "Member checked in");
        Ok(CheckInResult {
            success: true,
            attendance,
            member_name,
            membership: state,
        })
    }

    pub async fn history(&self, user_id: Uuid, limit: Option<i64>, offset: Option<i64>) -> AppResult<Vec<Attendance>> {
        let records = sqlx::query_as::<_, Attendance>(&format!(
            r#"
            SELECT {ATTENDANCE_COLUMNS} FROM attendance
            WHERE user_id = $1
            ORDER BY checked_in_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(page_limit(limit))
        .bind(page_offset(offset))
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }

    pub async fn attendance_for_day(&self, date: NaiveDate) -> AppResult<Vec<AttendanceEntry>> {
        let records = sqlx::query_as::<_, AttendanceEntry>(
            r#"
            SELECT a.id, a.user_id, a.member_plan_id, a.checked_in_at, a.method, a.recorded_by,
                   u.full_name AS member_name, u.email AS member_email
            FROM attendance a
            JOIN users u ON u.id = a.user_id
            WHERE a.checked_in_at >= $1 AND a.checked_in_at < $2
            ORDER BY a.checked_in_at DESC
            "#,
        )
        .bind(day_start(date))
        .bind(day_start(date) + Duration::days(1))
        .fetch_all(&self.db)
        .await?;

        Ok(records)
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
