use std::time::Duration;

use anyhow::Result;
use axum::{routing::get, Router};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

use super::admin::{admin_routes, AdminAppState};
use super::admin_forms::admin_form_routes;
use super::attendance::attendance_routes;
use super::auth::auth_routes;
use super::classes::class_routes;
use super::equipment::equipment_routes;
use super::feedback::feedback_routes;
use super::flash::flash_routes;
use super::health::{health_check, readiness_check};
use super::membership::{membership_routes, payment_routes, plan_routes};
use super::notifications::notification_routes;
use super::progress::{progress_routes, workout_routes};
use super::trainers::trainer_routes;
use super::training::training_routes;
use crate::auth::{cors_layer, security_headers_layer, AuthService, RateLimiter};
use crate::config::AppConfig;
use crate::services::{AttendanceService, FlashStore, QrRenderer, QrSigner};

/// Login/register attempts allowed per client per minute.
const AUTH_REQUESTS_PER_MINUTE: usize = 10;

pub fn create_routes(db: PgPool, config: &AppConfig) -> Result<Router> {
    let auth_service = AuthService::new(db.clone(), &config.jwt_secret);
    let rate_limiter = RateLimiter::new(AUTH_REQUESTS_PER_MINUTE, Duration::from_secs(60));
    let flash = FlashStore::new();
    let renderer = QrRenderer::new(config.qr_providers.clone(), config.qr_timeout)?;
    let attendance_service = AttendanceService::new(
        db.clone(),
        QrSigner::new(&config.qr_secret),
        config.checkin_cooldown_minutes,
    );
    let admin_state = AdminAppState::new(db.clone(), attendance_service.clone(), config.max_freeze_days);

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check).with_state(db.clone()))
        .nest("/api/auth", auth_routes(auth_service.clone(), rate_limiter))
        .nest("/api/flash", flash_routes(auth_service.clone(), flash.clone()))
        .nest("/api/plans", plan_routes(db.clone(), config.max_freeze_days))
        .nest(
            "/api/membership",
            membership_routes(db.clone(), auth_service.clone(), config.max_freeze_days),
        )
        .nest("/api/payments", payment_routes(db.clone(), auth_service.clone()))
        .nest("/api/trainers", trainer_routes(db.clone(), auth_service.clone()))
        .nest("/api/training-sessions", training_routes(db.clone(), auth_service.clone()))
        .nest("/api/classes", class_routes(db.clone(), auth_service.clone()))
        .nest("/api/progress", progress_routes(db.clone(), auth_service.clone()))
        .nest("/api/workouts", workout_routes(db.clone(), auth_service.clone()))
        .nest("/api/notifications", notification_routes(db.clone(), auth_service.clone()))
        .nest("/api/feedback", feedback_routes(db.clone(), auth_service.clone()))
        .nest("/api/equipment", equipment_routes(db.clone(), auth_service.clone()))
        .nest(
            "/api/attendance",
            attendance_routes(auth_service.clone(), attendance_service, renderer),
        )
        .nest("/api/admin", admin_routes(admin_state, auth_service.clone()))
        .nest("/admin", admin_form_routes(db, auth_service, flash))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(security_headers_layer());

    Ok(router)
}
