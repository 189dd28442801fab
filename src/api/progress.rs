use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::get,
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{
    ApiResponse, LogWorkoutRequest, MemberProgress, PaginationQuery, RecordProgressRequest, WorkoutPerformance,
    WorkoutSummary,
};
use crate::services::ProgressService;

pub fn progress_routes(db: PgPool, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(progress_history).post(record_progress))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(ProgressService::new(db))
}

pub fn workout_routes(db: PgPool, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(workout_history).post(log_workout))
        .route("/summary", get(workout_summary))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(ProgressService::new(db))
}

async fn progress_history(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<Vec<MemberProgress>>>> {
    Ok(Json(ApiResponse::ok(service.progress_history(session.user_id).await?)))
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn record_progress(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<RecordProgressRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<MemberProgress>>)> {
    let progress = service.record_progress(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(progress))))
}

async fn workout_history(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(page), _): WithRejection<Query<PaginationQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<WorkoutPerformance>>>> {
    let workouts = service
        .workout_history(session.user_id, page.limit, page.offset)
        .await?;
    Ok(Json(ApiResponse::ok(workouts)))
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn log_workout(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<LogWorkoutRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<WorkoutPerformance>>)> {
    let workout = service.log_workout(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(workout))))
}

async fn workout_summary(
    State(service): State<ProgressService>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<WorkoutSummary>>> {
    Ok(Json(ApiResponse::ok(service.workout_summary(session.user_id).await?)))
}
