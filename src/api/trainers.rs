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
use crate::models::{ApiResponse, TrainerFeedback, TrainerFeedbackRequest, TrainerProfile};
use crate::services::{FeedbackService, TrainerService};

#[derive(Clone)]
pub struct TrainersAppState {
    pub trainer_service: TrainerService,
    pub feedback_service: FeedbackService,
}

pub fn trainer_routes(db: PgPool, auth_service: AuthService) -> Router {
    let state = TrainersAppState {
        trainer_service: TrainerService::new(db.clone()),
        feedback_service: FeedbackService::new(db),
    };

    Router::new()
        .route("/", get(list_trainers))
        .route("/:id", get(get_trainer))
        .route("/:id/feedback", post(submit_feedback))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

async fn list_trainers(
    State(state): State<TrainersAppState>,
) -> AppResult<Json<ApiResponse<Vec<TrainerProfile>>>> {
    let trainers = state.trainer_service.list_trainers(false).await?;
    Ok(Json(ApiResponse::ok(trainers)))
}

async fn get_trainer(
    State(state): State<TrainersAppState>,
    WithRejection(Path(trainer_id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<ApiResponse<TrainerProfile>>> {
    let trainer = state.trainer_service.get_trainer(trainer_id).await?;
    Ok(Json(ApiResponse::ok(trainer)))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn submit_feedback(
    State(state): State<TrainersAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Path(trainer_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<TrainerFeedbackRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<TrainerFeedback>>)> {
    let feedback = state
        .feedback_service
        .submit_trainer_feedback(session.user_id, trainer_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message(feedback, "Thanks for your feedback"))))
}
