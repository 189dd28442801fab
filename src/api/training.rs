use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, UserRole, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, BookSessionRequest, TrainingSession, TrainingSessionDetails};
use crate::services::TrainingSessionService;

pub fn training_routes(db: PgPool, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(list_sessions).post(book_session))
        .route("/:id/cancel", post(cancel_session))
        .route("/:id/complete", post(complete_session))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(TrainingSessionService::new(db))
}

/// Trainers see the sessions booked with them; everyone else sees their own bookings.
#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn list_sessions(
    State(service): State<TrainingSessionService>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<Vec<TrainingSessionDetails>>>> {
    let sessions = match session.role {
        UserRole::Trainer => service.list_for_trainer(session.user_id).await?,
        _ => service.list_for_member(session.user_id).await?,
    };
    Ok(Json(ApiResponse::ok(sessions)))
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn book_session(
    State(service): State<TrainingSessionService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<BookSessionRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<TrainingSession>>)> {
    let booked = service.book(session.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(booked, "Session booked"))))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn cancel_session(
    State(service): State<TrainingSessionService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<TrainingSession>>> {
    let cancelled = service.cancel(session_id, &session).await?;
    Ok(Json(ApiResponse::with_message(cancelled, "Session cancelled")))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn complete_session(
    State(service): State<TrainingSessionService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(session_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<TrainingSession>>> {
    let completed = service.complete(session_id, &session).await?;
    Ok(Json(ApiResponse::with_message(completed, "Session completed")))
}
