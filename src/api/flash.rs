use axum::{extract::State, middleware, response::Json, routing::get, Extension, Router};

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::AppResult;
use crate::models::ApiResponse;
use crate::services::{FlashMessage, FlashStore};

pub fn flash_routes(auth_service: AuthService, flash: FlashStore) -> Router {
    Router::new()
        .route("/", get(take_flash))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(flash)
}

/// Drain the caller's pending flash messages
async fn take_flash(
    State(flash): State<FlashStore>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<Vec<FlashMessage>>>> {
    Ok(Json(ApiResponse::ok(flash.take(session.user_id))))
}
