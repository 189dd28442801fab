use axum::{
    extract::{Query, State},
    http::header,
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, Attendance, PaginationQuery, QrCodeResponse};
use crate::services::{AttendanceService, QrRenderer};

#[derive(Clone)]
pub struct AttendanceAppState {
    pub attendance_service: AttendanceService,
    pub renderer: QrRenderer,
}

pub fn attendance_routes(
    auth_service: AuthService,
    attendance_service: AttendanceService,
    renderer: QrRenderer,
) -> Router {
    Router::new()
        .route("/", get(attendance_history))
        .route("/qr", get(qr_code))
        .route("/qr.png", get(qr_image))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(AttendanceAppState {
            attendance_service,
            renderer,
        })
}

async fn attendance_history(
    State(state): State<AttendanceAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Query(page), _): WithRejection<Query<PaginationQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<Attendance>>>> {
    let records = state
        .attendance_service
        .history(session.user_id, page.limit, page.offset)
        .await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// Today's signed QR payload plus a link to a rendered image
async fn qr_code(
    State(state): State<AttendanceAppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<QrCodeResponse>> {
    let today = Utc::now().date_naive();
    let payload = state.attendance_service.signer().issue_json(session.user_id, today)?;
    let image_url = state.renderer.primary_image_url(&payload)?;

    Ok(Json(QrCodeResponse {
        success: true,
        payload,
        valid_on: today,
        image_url,
    }))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn qr_image(
    State(state): State<AttendanceAppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<impl IntoResponse> {
    let today = Utc::now().date_naive();
    let payload = state.attendance_service.signer().issue_json(session.user_id, today)?;
    let rendered = state.renderer.render(&payload).await?;

    Ok((
        [
            (header::CONTENT_TYPE, rendered.content_type),
            (header::CACHE_CONTROL, "private, max-age=300".to_string()),
        ],
        rendered.image,
    ))
}
