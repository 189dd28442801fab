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

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, ClassEnrollment, ClassListing, MessageResponse};
use crate::services::ClassService;

pub fn class_routes(db: PgPool, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(list_upcoming))
        .route("/enrolled", get(list_enrolled))
        .route("/:id/enroll", post(enroll).delete(unenroll))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(ClassService::new(db))
}

async fn list_upcoming(State(service): State<ClassService>) -> AppResult<Json<ApiResponse<Vec<ClassListing>>>> {
    Ok(Json(ApiResponse::ok(service.list_upcoming().await?)))
}

async fn list_enrolled(
    State(service): State<ClassService>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<Vec<ClassListing>>>> {
    Ok(Json(ApiResponse::ok(service.list_enrolled(session.user_id).await?)))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn enroll(
    State(service): State<ClassService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(class_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<ClassEnrollment>>)> {
    let enrollment = service.enroll(session.user_id, class_id).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(enrollment, "Enrolled"))))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn unenroll(
    State(service): State<ClassService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(class_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    service.unenroll(session.user_id, class_id).await?;
    Ok(Json(MessageResponse::new("Enrollment removed")))
}
