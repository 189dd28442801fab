use axum::{
    extract::{Query, State},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;

use crate::auth::{jwt_auth_middleware, AuthService};
use crate::error::{AppError, AppResult};
use crate::models::{ApiResponse, Equipment, EquipmentQuery};
use crate::services::EquipmentService;

pub fn equipment_routes(db: PgPool, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(list_equipment))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(EquipmentService::new(db))
}

async fn list_equipment(
    State(service): State<EquipmentService>,
    WithRejection(Query(query), _): WithRejection<Query<EquipmentQuery>, AppError>,
) -> AppResult<Json<ApiResponse<Vec<Equipment>>>> {
    Ok(Json(ApiResponse::ok(service.list_equipment(&query).await?)))
}
