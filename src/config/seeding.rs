use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::auth::{password::hash_password, UserRole};
use crate::models::normalize_email;

const DEMO_ADMIN_EMAIL: &str = "admin@gym.local";
const DEMO_ADMIN_PASSWORD: &str = "Admin#2024pass";
const DEMO_TRAINER_EMAIL: &str = "coach@gym.local";
const DEMO_TRAINER_PASSWORD: &str = "Coach#2024pass";

/// (name, description, price in cents, duration in days)
const DEFAULT_PLANS: [(&str, &str, i64, i32); 3] = [
    ("Monthly", "Unlimited gym access for 30 days", 4_500, 30),
    ("Quarterly", "Unlimited gym access for 90 days", 12_000, 90),
    ("Annual", "Unlimited gym access for a full year", 42_000, 365),
];

pub struct DatabaseSeeder {
    pool: PgPool,
}

impl DatabaseSeeder {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create demo data. Safe to run on every start.
    pub async fn seed_all(&self) -> Result<()> {
        tracing::info!("Starting database seeding...");

        self.seed_admin().await?;
        self.seed_plans().await?;
        self.seed_trainer().await?;

        tracing::info!("Database seeding completed!");
        Ok(())
    }

    async fn seed_admin(&self) -> Result<()> {
        let created = self
            .ensure_user(DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD, "Gym Administrator", UserRole::Admin)
            .await?;
        if created {
            tracing::info!(email = DEMO_ADMIN_EMAIL, "Created demo admin");
        }
        Ok(())
    }

    async fn seed_plans(&self) -> Result<()> {
        for (name, description, price_cents, duration_days) in DEFAULT_PLANS {
            let result = sqlx::query(
                r#"
                INSERT INTO membership_plans (name, description, price_cents, duration_days)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .bind(name)
            .bind(description)
            .bind(price_cents)
            .bind(duration_days)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to seed plan '{}'", name))?;

            if result.rows_affected() > 0 {
                tracing::info!(plan = name, "Created membership plan");
            }
        }
        Ok(())
    }

    async fn seed_trainer(&self) -> Result<()> {
        self.ensure_user(DEMO_TRAINER_EMAIL, DEMO_TRAINER_PASSWORD, "Alex Rivera", UserRole::Trainer)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO trainers (user_id, full_name, specialization, bio, hourly_rate_cents)
            SELECT id, full_name, 'Strength & Conditioning', 'Certified strength coach', 3500
            FROM users WHERE email = $1
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(DEMO_TRAINER_EMAIL)
        .execute(&self.pool)
        .await
        .context("Failed to seed trainer")?;

        if result.rows_affected() > 0 {
            tracing::info!(email = DEMO_TRAINER_EMAIL, "Created demo trainer");
        }
        Ok(())
    }

    async fn ensure_user(&self, email: &str, password: &str, full_name: &str, role: UserRole) -> Result<bool> {
        let email = normalize_email(email);
        let password_hash = hash_password(password).context("Failed to hash demo password")?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(&email)
        .bind(password_hash)
        .bind(full_name)
        .bind(role)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to seed user '{}'", email))?;

        Ok(result.rows_affected() > 0)
    }
}
