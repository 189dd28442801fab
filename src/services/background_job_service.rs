use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use uuid::Uuid;

use crate::models::NotificationKind;
use crate::services::notification_service::notify_on;

/// Every day at 00:05 UTC.
pub const DAILY_MAINTENANCE_CRON: &str = "0 5 0 * * *";

/// Members are reminded this many days before their plan ends.
pub const EXPIRY_NOTICE_DAYS: i64 = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub expired: u64,
    pub frozen: u64,
    pub unfrozen: u64,
    pub expiry_notices: u64,
}

pub struct BackgroundJobService {
    scheduler: Arc<RwLock<JobScheduler>>,
    db: PgPool,
}

impl BackgroundJobService {
    pub async fn new(db: PgPool) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("Failed to create job scheduler: {}", e))?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            db,
        })
    }

    /// Register the daily membership sweep and start the scheduler
    pub async fn start(&self) -> Result<()> {
        self.add_maintenance_job().await?;

        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| anyhow!("Failed to start job scheduler: {}", e))?;

        info!("Background job scheduler started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow!("Failed to stop job scheduler: {}", e))?;

        info!("Background job scheduler stopped");
        Ok(())
    }

    async fn add_maintenance_job(&self) -> Result<()> {
        let db = self.db.clone();

        let job = Job::new_async(DAILY_MAINTENANCE_CRON, move |_uuid, _l| {
            let db = db.clone();
            Box::pin(async move {
                let today = Utc::now().date_naive();
                match run_daily_maintenance(&db, today).await {
                    Ok(report) => info!(?report, "Daily membership maintenance finished"),
                    Err(e) => error!(error = %e, "Daily membership maintenance failed"),
                }
            })
        })
        .map_err(|e| anyhow!("Failed to create maintenance job: {}", e))?;

        let scheduler = self.scheduler.read().await;
        scheduler
            .add(job)
            .await
            .map_err(|e| anyhow!("Failed to add job to scheduler: {}", e))?;

        Ok(())
    }
}

/// Bring stored plan statuses in line with their dates and send expiry reminders.
/// Idempotent for a given `today`.
pub async fn run_daily_maintenance(db: &PgPool, today: NaiveDate) -> Result<MaintenanceReport> {
    let mut tx = db.begin().await?;
    let mut report = MaintenanceReport::default();

    report.expired = sqlx::query(
        r#"
        UPDATE member_plans SET status = 'expired', updated_at = NOW()
        WHERE status IN ('active', 'frozen') AND end_date < $1
        "#,
    )
    .bind(today)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    report.frozen = sqlx::query(
        r#"
        UPDATE member_plans SET status = 'frozen', updated_at = NOW()
        WHERE status = 'active' AND freeze_start <= $1 AND freeze_end >= $1
        "#,
    )
    .bind(today)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    report.unfrozen = sqlx::query(
        r#"
        UPDATE member_plans SET status = 'active', updated_at = NOW()
        WHERE status = 'frozen'
          AND end_date >= $1
          AND (freeze_start IS NULL OR freeze_start > $1 OR freeze_end < $1)
        "#,
    )
    .bind(today)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let expiring: Vec<(Uuid, Uuid, NaiveDate, String)> = sqlx::query_as(
        r#"
        SELECT mp.id, mp.user_id, mp.end_date, p.name
        FROM member_plans mp
        JOIN membership_plans p ON p.id = mp.plan_id
        WHERE mp.status = 'active' AND mp.end_date BETWEEN $1 AND $2
        "#,
    )
    .bind(today)
    .bind(today + Duration::days(EXPIRY_NOTICE_DAYS))
    .fetch_all(&mut *tx)
    .await?;

    for (member_plan_id, user_id, end_date, plan_name) in expiring {
        let dedupe_key = expiry_dedupe_key(member_plan_id);
        let message = format!(
            "Your {} membership ends on {}. Renew to keep your access.",
            plan_name, end_date
        );
        let sent = notify_on(
            &mut tx,
            user_id,
            NotificationKind::Membership,
            "Membership expiring soon",
            &message,
            Some(&dedupe_key),
        )
        .await
        .map_err(|e| anyhow!("Failed to send expiry notice for {}: {}", member_plan_id, e))?;

        if sent.is_some() {
            report.expiry_notices += 1;
        }
    }

    tx.commit().await?;
    Ok(report)
}

pub fn expiry_dedupe_key(member_plan_id: Uuid) -> String {
    format!("expiry:{}", member_plan_id)
}
