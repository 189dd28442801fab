use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use sqlx::PgPool;

use crate::auth::{jwt_auth_middleware, AuthService, UserSession};
use crate::error::{AppError, AppResult};
use crate::models::{
    ApiResponse, FreezeRequest, MemberPlan, MembershipOverview, MembershipPlan, Payment,
    SelectPlanRequest, SubmitPaymentRequest,
};
use crate::services::{MembershipService, PaymentService};

#[derive(Clone)]
pub struct MembershipAppState {
    pub membership_service: MembershipService,
    pub payment_service: PaymentService,
}

/// Public plan catalogue
pub fn plan_routes(db: PgPool, max_freeze_days: i64) -> Router {
    Router::new()
        .route("/", get(list_plans))
        .with_state(MembershipService::new(db, max_freeze_days))
}

pub fn membership_routes(db: PgPool, auth_service: AuthService, max_freeze_days: i64) -> Router {
    let state = MembershipAppState {
        membership_service: MembershipService::new(db.clone(), max_freeze_days),
        payment_service: PaymentService::new(db),
    };

    Router::new()
        .route("/", get(current_membership))
        .route("/select", post(select_plan))
        .route("/freeze", post(freeze).delete(cancel_freeze))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(state)
}

pub fn payment_routes(db: PgPool, auth_service: AuthService) -> Router {
    Router::new()
        .route("/", get(payment_history).post(submit_payment))
        .route_layer(middleware::from_fn_with_state(auth_service, jwt_auth_middleware))
        .with_state(PaymentService::new(db))
}

async fn list_plans(
    State(service): State<MembershipService>,
) -> AppResult<Json<ApiResponse<Vec<MembershipPlan>>>> {
    let plans = service.list_plans(false).await?;
    Ok(Json(ApiResponse::ok(plans)))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn current_membership(
    State(state): State<MembershipAppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<MembershipOverview>>> {
    let overview = state.membership_service.current_membership(session.user_id).await?;
    Ok(Json(ApiResponse::ok(overview)))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn select_plan(
    State(state): State<MembershipAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<SelectPlanRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<MemberPlan>>)> {
    let member_plan = state
        .membership_service
        .select_plan(session.user_id, request.plan_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            member_plan,
            "Plan selected; submit a payment to activate it",
        )),
    ))
}

#[tracing::instrument(skip(state, session, request), fields(user_id = %session.user_id))]
async fn freeze(
    State(state): State<MembershipAppState>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<FreezeRequest>, AppError>,
) -> AppResult<Json<ApiResponse<MemberPlan>>> {
    let member_plan = state.membership_service.freeze(session.user_id, request).await?;
    Ok(Json(ApiResponse::with_message(member_plan, "Membership freeze scheduled")))
}

#[tracing::instrument(skip(state, session), fields(user_id = %session.user_id))]
async fn cancel_freeze(
    State(state): State<MembershipAppState>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<MemberPlan>>> {
    let member_plan = state.membership_service.cancel_freeze(session.user_id).await?;
    Ok(Json(ApiResponse::with_message(member_plan, "Membership freeze cancelled")))
}

#[tracing::instrument(skip(service, session), fields(user_id = %session.user_id))]
async fn payment_history(
    State(service): State<PaymentService>,
    Extension(session): Extension<UserSession>,
) -> AppResult<Json<ApiResponse<Vec<Payment>>>> {
    let payments = service.payment_history(session.user_id).await?;
    Ok(Json(ApiResponse::ok(payments)))
}

#[tracing::instrument(skip(service, session, request), fields(user_id = %session.user_id))]
async fn submit_payment(
    State(service): State<PaymentService>,
    Extension(session): Extension<UserSession>,
    WithRejection(Json(request), _): WithRejection<Json<SubmitPaymentRequest>, AppError>,
) -> AppResult<(StatusCode, Json<ApiResponse<Payment>>)> {
    let payment = service.submit_payment(session.user_id, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(payment, "Payment submitted for review")),
    ))
}
