use axum::{
    extract::{Path, Query, State},
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, MessageResponse, NotificationQuery, UserNotification};
use crate::services::NotificationService;

pub fn notification_routes(db: PgPool, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(NotificationService::new(db))
}

async fn list_notifications(
    State(service): State<NotificationService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(query), _): WithRejection<Query<NotificationQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<UserNotification>>>> {
    let notifications = service.list(session.user_id, &query).await?;
    Ok(Json(ApiResponse::ok(notifications)))
}

async fn unread_count(
    State(service): State<NotificationService>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let count = service.unread_count(session.user_id).await?;
    Ok(Json(ApiResponse::ok(json!({ "unread": count }))))
}

async fn mark_read(
    State(service): State<NotificationService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(notification_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<MessageResponse>> {
    if !service.mark_read(session.user_id, notification_id).await? {
        return Err(AppError::not_found("Notification"));
    }
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn mark_all_read(
    State(service): State<NotificationService>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<Value>>> {
    let updated = service.mark_all_read(session.user_id).await?;
    Ok(Json(ApiResponse::ok(json!({ "updated": updated }))))
}
