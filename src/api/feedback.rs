use axum::{extract::State, http::StatusCode, middleware, response::Json, routing::post, Extension, Router};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, GymFeedback, GymFeedbackRequest};
use crate::services::FeedbackService;

pub fn feedback_routes(db: PgPool, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", post(submit_feedback))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(FeedbackService::new(db))
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn submit_feedback(
    State(service): State<FeedbackService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<GymFeedbackRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<GymFeedback>>)> {
    let feedback = service.submit_gym_feedback(session.user_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(feedback, "Thanks for your feedback")),
    ))
}
